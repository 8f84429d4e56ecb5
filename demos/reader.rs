//! Example reader process
//!
//! Attaches to the ring created by the writer demo as consumer 0 and prints
//! every payload it observes.

use shm_disruptor::{Disruptor, DisruptorConfig};

fn main() {
    let name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "disruptor_demo".to_string());

    let config = DisruptorConfig {
        capacity: 64,
        element_size: 8,
        consumer_count: 1,
        consumer_index: Some(0),
        spin: true,
    };

    println!("[Reader] Attaching to ring '{}'", name);
    let mut reader = match Disruptor::attach(&name, config) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("[Reader] Failed to attach: {}", e);
            eprintln!("[Reader] Is the writer running?");
            std::process::exit(1);
        }
    };

    let mut received = 0u64;
    while received < 1000 {
        let batch = reader.consume_new().unwrap().unwrap();
        let bytes = batch.to_vec();
        for chunk in bytes.chunks_exact(8) {
            let value = u64::from_le_bytes(chunk.try_into().unwrap());
            received += 1;
            if value % 100 == 0 {
                println!("[Reader] got {}", value);
            }
        }
        drop(batch);
        reader.consume_commit().unwrap();
    }

    println!("[Reader] Received {} payloads", received);
}
