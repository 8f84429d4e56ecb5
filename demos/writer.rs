//! Example writer process
//!
//! Creates the shared ring and publishes numbered 8-byte payloads.
//! Run the reader (`cargo run --example reader`) in another terminal.

use shm_disruptor::{Disruptor, DisruptorConfig};

fn main() {
    let name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "disruptor_demo".to_string());

    let config = DisruptorConfig {
        capacity: 64,
        element_size: 8,
        consumer_count: 1,
        consumer_index: None,
        spin: true,
    };

    println!("[Writer] Creating ring '{}'", name);
    let writer = match Disruptor::create(&name, config) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("[Writer] Failed to create ring: {}", e);
            std::process::exit(1);
        }
    };

    for i in 0..1000u64 {
        let mut claim = writer.produce_claim().unwrap().unwrap();
        claim.bufs().0.copy_from_slice(&i.to_le_bytes());
        writer.produce_commit(&claim).unwrap();

        if i % 100 == 0 {
            println!("[Writer] published sequence {}", claim.start());
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }

    println!("[Writer] Done. Leaving the region for the reader; unlink with:");
    println!("[Writer]   shm_disruptor::Disruptor::unlink(\"{}\")", name);
}
