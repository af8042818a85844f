//! End-to-end client benchmarks against a loopback receiver.

use avrlink_client::{Client, ClientEvent, ConnectionConfig};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::sync::broadcast::error::RecvError;

/// Starts a receiver that answers every read with `burst` status lines.
fn setup_receiver_and_client(rt: &Runtime, burst: usize) -> Client {
    let burst_data: Vec<u8> = ["MV455\r", "PWON\r", "NSE1 Airbag\r", "Z2OFF\r"]
        .iter()
        .cycle()
        .take(burst)
        .flat_map(|line| line.bytes())
        .collect();

    rt.block_on(async {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            loop {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if stream.write_all(&burst_data).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let client = Client::new();
        let mut events = client.subscribe();
        let config = ConnectionConfig::new("127.0.0.1", port)
            .with_connect_timeout(Duration::from_secs(60))
            .with_poll_interval(Duration::from_secs(3600));
        client.connect(config).await;

        while !matches!(events.recv().await, Ok(ClientEvent::Connected)) {}

        // Let the handshake responses drain.
        tokio::time::sleep(Duration::from_millis(100)).await;
        client
    })
}

fn bench_status_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("e2e_status_burst");

    for burst in [1, 10, 100] {
        let rt = Runtime::new().unwrap();
        let client = setup_receiver_and_client(&rt, burst);

        group.throughput(Throughput::Elements(burst as u64));
        group.bench_with_input(BenchmarkId::from_parameter(burst), &burst, |b, &burst| {
            b.to_async(&rt).iter(|| async {
                let mut events = client.subscribe();
                client.query("PW").await.unwrap();

                let mut parsed = 0;
                while parsed < burst {
                    match events.recv().await {
                        Ok(ClientEvent::Parsed(field, value)) => {
                            black_box((field, value));
                            parsed += 1;
                        }
                        Err(RecvError::Lagged(skipped)) => parsed += skipped as usize,
                        _ => {}
                    }
                }
            });
        });

        rt.block_on(client.disconnect());
    }

    group.finish();
}

criterion_group!(benches, bench_status_burst);
criterion_main!(benches);
