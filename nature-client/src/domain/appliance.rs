use serde::{Deserialize, Deserializer};

/// Treat JSON `null` like a missing field.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Option::unwrap_or_default)
}

/// ECHONET Lite property codes exposed by the smart meter.
pub mod epc {
    /// Instantaneous electric power, W.
    pub const INSTANTANEOUS_POWER: &str = "e7";
    /// Cumulative electric energy, normal direction.
    pub const CUMULATIVE_ENERGY_NORMAL: &str = "e0";
    /// Unit for cumulative electric energy.
    pub const CUMULATIVE_ENERGY_UNIT: &str = "e1";
    /// Cumulative electric energy, reverse direction.
    pub const CUMULATIVE_ENERGY_REVERSE: &str = "e3";
    /// Measured cumulative electric energy (effective power).
    pub const MEASURED_CUMULATIVE_ENERGY: &str = "d3";
    /// Unit for measured cumulative electric energy.
    pub const MEASURED_CUMULATIVE_ENERGY_UNIT: &str = "d7";
}

/// A Nature Remo device as returned by `GET /1/devices`.
#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    pub firmware_version: Option<String>,
    pub mac_address: Option<String>,
    pub serial_number: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// An IR appliance as returned by `GET /1/appliances`.
#[derive(Debug, Clone, Deserialize)]
pub struct Appliance {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nickname: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EchonetProperty {
    #[serde(default, deserialize_with = "null_as_default")]
    pub epc: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub val: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: String,
}

impl EchonetProperty {
    pub fn is(&self, code: &str) -> bool {
        self.epc.trim().eq_ignore_ascii_case(code)
    }
}

/// An ECHONET Lite appliance (smart meter) as returned by
/// `GET /1/echonetlite/appliances`.
#[derive(Debug, Clone, Deserialize)]
pub struct EchonetAppliance {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nickname: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: Vec<EchonetProperty>,
}

impl EchonetAppliance {
    /// First property carrying `code`, compared case-insensitively.
    pub fn property(&self, code: &str) -> Option<&EchonetProperty> {
        self.properties.iter().find(|p| p.is(code))
    }

    pub fn reports_instantaneous_power(&self) -> bool {
        self.property(epc::INSTANTANEOUS_POWER).is_some()
    }
}

/// The ECHONET listing comes back either bare or wrapped in `{"appliances": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum EchonetAppliancesResponse {
    List(Vec<EchonetAppliance>),
    Wrapped { appliances: Vec<EchonetAppliance> },
}

impl From<EchonetAppliancesResponse> for Vec<EchonetAppliance> {
    fn from(r: EchonetAppliancesResponse) -> Self {
        match r {
            EchonetAppliancesResponse::List(v) => v,
            EchonetAppliancesResponse::Wrapped { appliances } => appliances,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METER_JSON: &str = r#"{
        "id": "meter-1",
        "nickname": "Smart Meter",
        "type": "EL_SMART_METER",
        "properties": [
            {"epc": "d3", "val": "1", "updated_at": "2024-05-01T12:00:00Z"},
            {"epc": "E7", "val": "01f4", "updated_at": "2024-05-01T12:00:05Z"},
            {"epc": "e7", "val": "ffff", "updated_at": "2024-05-01T12:00:06Z"}
        ]
    }"#;

    #[test]
    fn property_lookup_is_case_insensitive_and_first_wins() {
        let a: EchonetAppliance = serde_json::from_str(METER_JSON).unwrap();
        let p = a.property(epc::INSTANTANEOUS_POWER).unwrap();
        assert_eq!(p.val, "01f4");
        assert!(a.reports_instantaneous_power());
        assert_eq!(a.kind, "EL_SMART_METER");
    }

    #[test]
    fn appliances_response_accepts_bare_list() {
        let body = format!("[{METER_JSON}]");
        let r: EchonetAppliancesResponse = serde_json::from_str(&body).unwrap();
        let list: Vec<EchonetAppliance> = r.into();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "meter-1");
    }

    #[test]
    fn appliances_response_accepts_wrapped_object() {
        let body = format!(r#"{{"appliances": [{METER_JSON}]}}"#);
        let r: EchonetAppliancesResponse = serde_json::from_str(&body).unwrap();
        let list: Vec<EchonetAppliance> = r.into();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn appliances_response_rejects_unexpected_shape() {
        let r = serde_json::from_str::<EchonetAppliancesResponse>(r#"{"items": []}"#);
        assert!(r.is_err());
    }

    #[test]
    fn null_values_do_not_reject_the_listing() {
        let body = r#"[{"id": "meter-1", "nickname": null, "type": "EL_SMART_METER",
            "properties": [
                {"epc": "e7", "val": null, "updated_at": "2024-05-01T12:00:00Z"},
                {"epc": "e0", "val": "ff", "updated_at": null}
            ]}]"#;
        let r: EchonetAppliancesResponse = serde_json::from_str(body).unwrap();
        let list: Vec<EchonetAppliance> = r.into();
        assert_eq!(list[0].nickname, "");
        assert_eq!(list[0].properties[0].val, "");
        assert_eq!(list[0].properties[1].updated_at, "");
    }

    #[test]
    fn device_tolerates_missing_optional_fields() {
        let d: Device = serde_json::from_str(r#"{"id": "dev-1", "name": "Remo E lite"}"#).unwrap();
        assert_eq!(d.name, "Remo E lite");
        assert!(d.firmware_version.is_none());
    }
}
