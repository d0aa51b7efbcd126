use mock_server::MockConfig;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let mut config = MockConfig::default();
    if let Ok(token) = std::env::var("MOCK_TOKEN") {
        config.tokens = vec![token];
    }
    if let Ok(location_id) = std::env::var("MOCK_LOCATION_ID") {
        config.location_id = location_id;
    }
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    println!("listening on {addr} (location {})", config.location_id);
    mock_server::run(listener, config).await
}
