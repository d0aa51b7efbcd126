use crate::client::{EndpointCall, GhlClient};
use crate::error::ApiFailure;
use crate::types::Location;

impl GhlClient {
    pub async fn get_location(&self, location_id: &str) -> Result<Location, ApiFailure> {
        self.send(
            EndpointCall::get("/locations")
                .segment(location_id)
                .unwrap_key("location"),
        )
        .await
    }
}
