use nature_client::domain::{epc, EchonetAppliance, EchonetProperty, Reading};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("appliance {appliance_id} has no instantaneous power property")]
    NotFound { appliance_id: String },
    #[error("could not decode '{value}' as hex: {reason}")]
    Decode { value: String, reason: String },
}

fn parse_hex(val: &str) -> Result<i64, ExtractError> {
    i64::from_str_radix(val.trim(), 16).map_err(|e| ExtractError::Decode {
        value: val.to_string(),
        reason: e.to_string(),
    })
}

/// Pull the instantaneous power reading out of a smart meter's properties.
///
/// The first `e7` property wins. A missing property is `NotFound`; a property
/// whose value is not hex is `Decode`.
pub fn extract_power(appliance: &EchonetAppliance) -> Result<Reading, ExtractError> {
    let prop = appliance
        .property(epc::INSTANTANEOUS_POWER)
        .ok_or_else(|| ExtractError::NotFound {
            appliance_id: appliance.id.clone(),
        })?;

    let watts = parse_hex(&prop.val)?;

    Ok(Reading::new(
        watts,
        appliance.id.as_str(),
        appliance.nickname.as_str(),
        prop.updated_at.as_str(),
    ))
}

/// Energy unit advertised by `e1`/`d7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyUnit {
    Wh,
    TenthKwh,
    HundredthKwh,
    ThousandthKwh,
    TenThousandthKwh,
    Unknown(i64),
}

impl EnergyUnit {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => EnergyUnit::Wh,
            1 => EnergyUnit::TenthKwh,
            2 => EnergyUnit::HundredthKwh,
            3 => EnergyUnit::ThousandthKwh,
            4 => EnergyUnit::TenThousandthKwh,
            other => EnergyUnit::Unknown(other),
        }
    }
}

impl std::fmt::Display for EnergyUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnergyUnit::Wh => f.write_str("Wh"),
            EnergyUnit::TenthKwh => f.write_str("0.1 kWh"),
            EnergyUnit::HundredthKwh => f.write_str("0.01 kWh"),
            EnergyUnit::ThousandthKwh => f.write_str("0.001 kWh"),
            EnergyUnit::TenThousandthKwh => f.write_str("0.0001 kWh"),
            EnergyUnit::Unknown(code) => write!(f, "Unknown (code: {code})"),
        }
    }
}

/// A smart meter property decoded for display.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedProperty {
    InstantaneousPower { watts: i64 },
    CumulativeEnergyNormal { wh: i64 },
    CumulativeEnergyReverse { wh: i64 },
    MeasuredCumulativeEnergy { wh: i64 },
    MeasuredEnergyUnit(EnergyUnit),
    EnergyUnit(EnergyUnit),
    Unknown { epc: String, val: String, updated_at: String },
}

fn parse_unit(val: &str) -> Result<EnergyUnit, ExtractError> {
    if val.trim().is_empty() {
        return Ok(EnergyUnit::Wh);
    }
    parse_hex(val).map(EnergyUnit::from_code)
}

pub fn decode_property(prop: &EchonetProperty) -> Result<DecodedProperty, ExtractError> {
    let code = prop.epc.trim().to_ascii_lowercase();
    let decoded = match code.as_str() {
        epc::INSTANTANEOUS_POWER => DecodedProperty::InstantaneousPower {
            watts: parse_hex(&prop.val)?,
        },
        epc::CUMULATIVE_ENERGY_NORMAL => DecodedProperty::CumulativeEnergyNormal {
            wh: parse_hex(&prop.val)?,
        },
        epc::CUMULATIVE_ENERGY_REVERSE => DecodedProperty::CumulativeEnergyReverse {
            wh: parse_hex(&prop.val)?,
        },
        epc::MEASURED_CUMULATIVE_ENERGY => DecodedProperty::MeasuredCumulativeEnergy {
            wh: parse_hex(&prop.val)?,
        },
        epc::MEASURED_CUMULATIVE_ENERGY_UNIT => DecodedProperty::MeasuredEnergyUnit(parse_unit(&prop.val)?),
        epc::CUMULATIVE_ENERGY_UNIT => DecodedProperty::EnergyUnit(parse_unit(&prop.val)?),
        _ => DecodedProperty::Unknown {
            epc: code,
            val: prop.val.clone(),
            updated_at: prop.updated_at.clone(),
        },
    };
    Ok(decoded)
}

impl std::fmt::Display for DecodedProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodedProperty::InstantaneousPower { watts } => {
                write!(f, "Instantaneous Power: {watts} W ({:.3} kW)", *watts as f64 / 1000.0)
            }
            DecodedProperty::CumulativeEnergyNormal { wh } => {
                write!(f, "Cumulative Energy (normal): {:.3} kWh ({wh} Wh)", *wh as f64 / 1000.0)
            }
            DecodedProperty::CumulativeEnergyReverse { wh } => {
                write!(f, "Cumulative Energy (reverse): {:.3} kWh ({wh} Wh)", *wh as f64 / 1000.0)
            }
            DecodedProperty::MeasuredCumulativeEnergy { wh } => {
                write!(f, "Cumulative Energy (effective): {:.3} kWh ({wh} Wh)", *wh as f64 / 1000.0)
            }
            DecodedProperty::MeasuredEnergyUnit(unit) => write!(f, "Energy Unit (effective): {unit}"),
            DecodedProperty::EnergyUnit(unit) => write!(f, "Energy Unit: {unit}"),
            DecodedProperty::Unknown { epc, val, updated_at } => {
                write!(f, "EPC {epc}: {val} (hex, updated: {updated_at})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(epc: &str, val: &str) -> EchonetProperty {
        EchonetProperty {
            epc: epc.to_string(),
            val: val.to_string(),
            updated_at: "2024-05-01T12:00:00Z".to_string(),
        }
    }

    fn meter(properties: Vec<EchonetProperty>) -> EchonetAppliance {
        EchonetAppliance {
            id: "meter-1".to_string(),
            nickname: "Smart Meter".to_string(),
            kind: "EL_SMART_METER".to_string(),
            properties,
        }
    }

    #[test]
    fn extracts_hex_watts_and_kw() {
        let r = extract_power(&meter(vec![prop("e0", "ff"), prop("e7", "01f4")])).unwrap();
        assert_eq!(r.power_watts, 500);
        assert_eq!(r.power_kw, 0.5);
        assert_eq!(r.appliance_id, "meter-1");
        assert_eq!(r.appliance_name, "Smart Meter");
        assert_eq!(r.updated_at, "2024-05-01T12:00:00Z");
    }

    #[test]
    fn epc_match_is_case_insensitive_and_first_wins() {
        let r = extract_power(&meter(vec![prop("E7", "0A"), prop("e7", "FF")])).unwrap();
        assert_eq!(r.power_watts, 10);
    }

    #[test]
    fn missing_power_property_is_not_found() {
        let err = extract_power(&meter(vec![prop("e0", "ff")])).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound { .. }));
    }

    #[test]
    fn malformed_power_value_is_decode_error() {
        let err = extract_power(&meter(vec![prop("e7", "not-hex")])).unwrap_err();
        assert!(matches!(err, ExtractError::Decode { .. }));

        let err = extract_power(&meter(vec![prop("e7", "")])).unwrap_err();
        assert!(matches!(err, ExtractError::Decode { .. }));
    }

    #[test]
    fn decodes_energy_and_unit_properties() {
        assert_eq!(
            decode_property(&prop("E0", "0001e240")).unwrap(),
            DecodedProperty::CumulativeEnergyNormal { wh: 123_456 }
        );
        assert_eq!(
            decode_property(&prop("d7", "02")).unwrap(),
            DecodedProperty::MeasuredEnergyUnit(EnergyUnit::HundredthKwh)
        );
        assert_eq!(
            decode_property(&prop("e1", "")).unwrap(),
            DecodedProperty::EnergyUnit(EnergyUnit::Wh)
        );
        assert_eq!(
            decode_property(&prop("e1", "0a")).unwrap().to_string(),
            "Energy Unit: Unknown (code: 10)"
        );
    }

    #[test]
    fn unknown_epc_keeps_raw_value() {
        let d = decode_property(&prop("D5", "abc")).unwrap();
        assert_eq!(d.to_string(), "EPC d5: abc (hex, updated: 2024-05-01T12:00:00Z)");
    }

    #[test]
    fn power_display_has_three_decimal_kw() {
        let d = decode_property(&prop("e7", "04d2")).unwrap();
        assert_eq!(d.to_string(), "Instantaneous Power: 1234 W (1.234 kW)");
    }
}
