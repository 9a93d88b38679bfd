//! Locate a domain controller for a domain named on the command line
//! (or, if omitted, the local machine's own domain).
use std::time::Duration;

use dc_locator::{DcLocatorBuilder, DcLocatorRequestBuilder, DsFlag};

fn main() {
    env_logger::init();

    let mut builder = DcLocatorRequestBuilder::new().read_timeout(Duration::from_secs(5));
    if let Some(domain) = std::env::args().nth(1) {
        builder = builder.domain_name(domain);
    }
    let request = match builder.build() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("invalid request: {e}");
            std::process::exit(2);
        }
    };

    let locator = match DcLocatorBuilder::new()
        .read_timeout(Duration::from_secs(2))
        .build()
    {
        Ok(l) => l,
        Err(e) => {
            eprintln!("could not build locator: {e}");
            std::process::exit(1);
        }
    };

    match locator.locate(&request) {
        Ok(info) => {
            println!("domain controller: {}", info.domain_controller_name);
            if let Some(ip) = info.ip_address {
                println!("ip address:        {ip}");
            }
            println!("domain:             {}", info.domain_name.as_deref().unwrap_or("?"));
            println!("forest:             {}", info.dns_forest_name);
            println!("site:               {}", info.dc_site_name);
            if info.flags.contains(DsFlag::Closest) {
                println!("(in the client's own site)");
            }
        }
        Err(e) => {
            eprintln!("locate failed: {e}");
            std::process::exit(1);
        }
    }
}
