use std::net::Ipv4Addr;

const SENTINEL_PORT: &str = "SENTINEL_PORT";

const DEFAULT_PORT: u16 = 12808;

pub fn get_default_port() -> u16 {
    DEFAULT_PORT
}

pub fn get_port() -> u16 {
    let port_from_env = std::env::var(SENTINEL_PORT);
    port_from_env.map_or(DEFAULT_PORT, |res| res.parse().unwrap_or(DEFAULT_PORT))
}

const SENTINEL_ADDR: &str = "SENTINEL_ADDR";

const DEFAULT_ADDR: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);

pub fn get_addr() -> Ipv4Addr {
    let addr_from_env = std::env::var(SENTINEL_ADDR);
    addr_from_env.map_or(DEFAULT_ADDR, |res| res.parse().unwrap_or(DEFAULT_ADDR))
}

const SENTINEL_SECRET: &str = "SENTINEL_SECRET";

/// Bearer token required by the HTTP API, if any
pub fn get_secret() -> Option<String> {
    std::env::var(SENTINEL_SECRET)
        .ok()
        .filter(|secret| !secret.trim().is_empty())
}
