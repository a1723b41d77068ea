use nature_client::{domain::EchonetAppliance, NatureClient, Reading};

use crate::{
    pipeline::{PollError, ReadingSource},
    transform,
};

/// Polls one smart meter through the Nature Remo Cloud API.
///
/// The HTTP client blocks (including its rate-limit wait), so each fetch runs
/// on the blocking pool.
pub struct NatureRemoSource {
    client: NatureClient,
    appliance_id: String,
}

impl NatureRemoSource {
    pub fn new(client: NatureClient, appliance_id: impl Into<String>) -> Self {
        Self {
            client,
            appliance_id: appliance_id.into(),
        }
    }
}

#[async_trait::async_trait]
impl ReadingSource for NatureRemoSource {
    async fn fetch_reading(&self) -> Result<Reading, PollError> {
        let client = self.client.clone();
        let id = self.appliance_id.clone();

        let appliance = tokio::task::spawn_blocking(move || client.echonetlite_appliance(&id))
            .await
            .map_err(|e| PollError::Transient(format!("fetch task failed: {e}")))??;

        let appliance = appliance.ok_or_else(|| {
            PollError::NotFound(format!("appliance {} is no longer listed", self.appliance_id))
        })?;

        Ok(transform::extract_power(&appliance)?)
    }
}

/// Pick the meter to monitor: the pinned id if given, else the first ECHONET
/// appliance that reports instantaneous power.
pub fn discover_meter<'a>(
    appliances: &'a [EchonetAppliance],
    pinned: Option<&str>,
) -> Option<&'a EchonetAppliance> {
    match pinned {
        Some(id) => appliances.iter().find(|a| a.id == id),
        None => appliances.iter().find(|a| a.reports_instantaneous_power()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nature_client::domain::EchonetProperty;

    fn appliance(id: &str, epcs: &[&str]) -> EchonetAppliance {
        EchonetAppliance {
            id: id.to_string(),
            nickname: format!("{id} nick"),
            kind: "EL_SMART_METER".to_string(),
            properties: epcs
                .iter()
                .map(|e| EchonetProperty {
                    epc: e.to_string(),
                    val: "00".to_string(),
                    updated_at: "2024-05-01T12:00:00Z".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn discovers_first_appliance_with_power_property() {
        let list = vec![appliance("solar", &["e0"]), appliance("meter", &["E7"]), appliance("meter-2", &["e7"])];
        assert_eq!(discover_meter(&list, None).map(|a| a.id.as_str()), Some("meter"));
    }

    #[test]
    fn pinned_id_wins_over_discovery() {
        let list = vec![appliance("meter", &["e7"]), appliance("meter-2", &["e7"])];
        assert_eq!(discover_meter(&list, Some("meter-2")).map(|a| a.id.as_str()), Some("meter-2"));
        assert!(discover_meter(&list, Some("missing")).is_none());
    }

    #[test]
    fn nothing_to_discover() {
        assert!(discover_meter(&[], None).is_none());
        assert!(discover_meter(&[appliance("solar", &["e0"])], None).is_none());
    }

    mod http {
        use super::super::*;
        use std::time::Duration;

        use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};

        const BODY: &str = r#"{"appliances":[{"id":"meter-1","nickname":"Smart Meter","type":"EL_SMART_METER",
            "properties":[{"epc":"e7","val":"0320","updated_at":"2024-05-01T12:00:00Z"}]}]}"#;

        async fn serve(app: Router) -> NatureClient {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app.into_make_service()).await.unwrap();
            });
            NatureClient::new(format!("http://{addr}"), "token", Duration::from_secs(5))
        }

        fn meter_app() -> Router {
            Router::new().route(
                "/1/echonetlite/appliances",
                get(|| async { ([("content-type", "application/json")], BODY).into_response() }),
            )
        }

        #[tokio::test(flavor = "multi_thread")]
        async fn fetches_and_extracts_reading() {
            let source = NatureRemoSource::new(serve(meter_app()).await, "meter-1");
            let r = source.fetch_reading().await.unwrap();
            assert_eq!(r.power_watts, 800);
            assert_eq!(r.updated_at, "2024-05-01T12:00:00Z");
        }

        #[tokio::test(flavor = "multi_thread")]
        async fn unlisted_meter_is_not_found() {
            let source = NatureRemoSource::new(serve(meter_app()).await, "meter-9");
            let err = source.fetch_reading().await.unwrap_err();
            assert!(matches!(err, PollError::NotFound(_)));
        }

        #[tokio::test(flavor = "multi_thread")]
        async fn unauthorized_maps_to_auth() {
            let app = Router::new().route("/1/echonetlite/appliances", get(|| async { StatusCode::UNAUTHORIZED }));
            let source = NatureRemoSource::new(serve(app).await, "meter-1");
            let err = source.fetch_reading().await.unwrap_err();
            assert!(err.is_fatal());
        }
    }
}
