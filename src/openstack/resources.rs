use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// Compute server record
///
/// Only the fields this crate reads are typed; everything else the compute
/// service returns is kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "adminPass", default, skip_serializing_if = "Option::is_none")]
    pub admin_pass: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request payload for server creation
///
/// Sent verbatim inside the `{"server": ...}` envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSpec {
    pub name: String,
    #[serde(rename = "imageRef")]
    pub image_ref: String,
    #[serde(rename = "flavorRef")]
    pub flavor_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServerSpec {
    pub fn new(
        name: impl Into<String>,
        image_ref: impl Into<String>,
        flavor_ref: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            image_ref: image_ref.into(),
            flavor_ref: flavor_ref.into(),
            key_name: None,
            extra: Map::new(),
        }
    }

    /// Set the keypair name (builder pattern)
    pub fn with_key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = Some(key_name.into());
        self
    }

    /// Add an arbitrary field forwarded as-is (builder pattern)
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Identifier sent either as a string (neutron proxy) or an integer (nova-network)
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(Number),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|id| match id {
            StringOrNumber::String(id) => id,
            StringOrNumber::Number(id) => id.to_string(),
        }),
    )
}

/// Floating IP record from the compute service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatingIp {
    /// Always a string here, whichever form the service used
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    pub ip: String,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub fixed_ip: Option<String>,
    #[serde(default)]
    pub pool: Option<String>,
}

impl FloatingIp {
    /// True when no instance is attached to this address
    pub fn is_available(&self) -> bool {
        self.instance_id.as_deref().map_or(true, str::is_empty)
    }
}

/// Image record from the image service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub disk_format: Option<String>,
    #[serde(default)]
    pub container_format: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Image metadata registered before the data upload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ImageMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set disk and container formats (builder pattern)
    pub fn with_formats(
        mut self,
        disk_format: impl Into<String>,
        container_format: impl Into<String>,
    ) -> Self {
        self.disk_format = Some(disk_format.into());
        self.container_format = Some(container_format.into());
        self
    }

    /// Set visibility, e.g. "public" or "private" (builder pattern)
    pub fn with_visibility(mut self, visibility: impl Into<String>) -> Self {
        self.visibility = Some(visibility.into());
        self
    }

    /// Add an arbitrary image property (builder pattern)
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// `{"server": ...}` envelope used by the compute API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ServerEnvelope<T> {
    pub server: T,
}

/// `{"floating_ips": [...]}` list envelope
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FloatingIpList {
    #[serde(default)]
    pub floating_ips: Vec<FloatingIp>,
}

/// `{"floating_ip": ...}` envelope
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FloatingIpEnvelope {
    pub floating_ip: FloatingIp,
}
