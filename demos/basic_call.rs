//! Basic example reading and configuring a device.
//!
//! This example shows how to:
//! - Create a client for a device
//! - Read objects by class and by DN
//! - Build a request body with `Body`
//! - Run a CLI command over JSON-RPC
//!
//! Run with:
//! `NXAPI_URL=https://10.0.0.1 NXAPI_USER=admin NXAPI_PASSWORD=secret cargo run --example basic_call`

use nxapi::{Body, Client, Error, RequestOptions};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("nxapi=debug,basic_call=info")
        .init();

    let url = std::env::var("NXAPI_URL").unwrap_or_else(|_| "https://10.0.0.1".to_string());
    let user = std::env::var("NXAPI_USER").unwrap_or_else(|_| "admin".to_string());
    let password = std::env::var("NXAPI_PASSWORD").unwrap_or_default();

    let client = Client::new(url, user, password, true)?;

    println!("=== Interfaces ===");
    let options = RequestOptions::new()
        .with_query_param("query-target-filter", r#"eq(l1PhysIf.adminSt,"up")"#);
    let interfaces = client.get_class_with("l1PhysIf", options).await?;
    for interface in interfaces.array() {
        let attributes = interface.get("l1PhysIf.attributes");
        println!(
            "{} mtu={} speed={}",
            attributes.get("id").str(),
            attributes.get("mtu").str(),
            attributes.get("speed").str()
        );
    }
    println!("Request latency: {:?}", interfaces.latency);
    println!();

    println!("=== BGP ===");
    match client.get_dn("sys/bgp").await {
        Ok(bgp) => println!("Admin state: {}", bgp.get("bgpEntity.attributes.adminSt").str()),
        Err(Error::Api { code, text, .. }) => println!("No BGP ({}): {}", code, text),
        Err(e) => return Err(e),
    }
    println!();

    println!("=== Configure interface description ===");
    let body = Body::new()
        .set("l1PhysIf.attributes.id", "eth1/1")
        .set("l1PhysIf.attributes.descr", "uplink");
    let response = client.post("sys/intf/phys-[eth1/1]", body).await?;
    println!("Status: {}, attempts: {}", response.status, response.attempts);
    println!();

    println!("=== JSON-RPC ===");
    let response = client.json_rpc("show version").await?;
    println!("{}", response.get("result.body.nxos_ver_str").str());

    Ok(())
}
