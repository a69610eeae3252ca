//! Ampere RTU demo client
//!
//! Opens a serial port at 9600 8N1 with link and protocol recovery
//! enabled, reads four coils from slave 35 and prints them.
//!
//! Usage: cargo run --bin demo [device_path]
//! Example: cargo run --bin demo /dev/ttyUSB0

use ampere_rtu::{RecoveryMode, RtuMaster, SerialConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Ampere RTU demo client v{}", ampere_rtu::VERSION);

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyUSB0".to_string());

    let config = SerialConfig::new(&path, 9600);
    println!("Connecting to {} at 9600 8N1...", path);

    let mut master = match RtuMaster::open_with_recovery(config, RecoveryMode::all()) {
        Ok(master) => master,
        Err(e) => {
            eprintln!("Connection failed: {}", e);
            std::process::exit(1);
        }
    };

    println!("RS-485 turnaround: {}", master.link().config().rs485);

    let slave = 35;
    match master.read_coils(slave, 0, 4).await {
        Ok(bits) => {
            let states: Vec<u8> = bits.iter().map(|&b| b as u8).collect();
            println!("Coils 0-3 of slave {}: {:?}", slave, states);
        }
        Err(e) => {
            eprintln!("Could not read coils: {}", e);
            let _ = master.close().await;
            std::process::exit(1);
        }
    }

    let stats = master.stats();
    println!(
        "Requests: {}, responses: {}, reconnects: {}",
        stats.requests_sent, stats.responses_received, stats.reconnects
    );

    master.close().await?;
    Ok(())
}
