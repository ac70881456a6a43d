//! kextwire - Codec PoC & Benchmark
//!
//! Encode event koneksi dalam envelope Command, decode, dan mutasi in-place,
//! lalu laporkan latency per operasi.
//!
//! Usage:
//!   cargo run --release -- [ITERATIONS]
//!   RUST_LOG=debug cargo run -- 10

use std::time::Instant;

use kextwire::core::FrameReader;
use kextwire::protocol::{
    encode_packet_command, root_as_command, root_as_command_mut, size_prefixed_root_as_command,
    ConnectionEvent, Direction, IpProtocol, PacketArgs,
};
use kextwire::{Builder, Result};
use log::{error, info};

const DEFAULT_ITERATIONS: usize = 1_000_000;

fn main() {
    env_logger::init();

    let iterations = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_ITERATIONS);

    println!("🚀 kextwire Codec - PoC v0.1");
    println!("============================\n");

    if let Err(e) = run(iterations) {
        error!("benchmark aborted: {}", e);
        std::process::exit(1);
    }

    println!("\n✅ All benchmarks complete!");
}

fn run(iterations: usize) -> Result<()> {
    let local = [0xC0A8_0102u32];
    let remote = [0x5DB8_D822u32];
    let args = PacketArgs {
        id: 1,
        process_id: Some(4321),
        process_path: Some(&b"/usr/lib/firefox/firefox"[..]),
        direction: Direction::Outbound as u8,
        ip_v6: false,
        protocol: IpProtocol::Tcp as u8,
        local_ip: Some(&local[..]),
        remote_ip: Some(&remote[..]),
        local_port: 49152,
        remote_port: 443,
    };

    let mut fbb = Builder::with_capacity(256);
    let sample = encode_packet_command(&mut fbb, &args, false)?.to_vec();
    if let Some(packet) = root_as_command(&sample).command_as_packet() {
        info!("sample event: {}", ConnectionEvent::from(&packet));
    }

    benchmark_encode(&mut fbb, &args, iterations)?;
    benchmark_decode(&sample, iterations);
    benchmark_mutate(&sample, iterations);
    benchmark_frames(&mut fbb, &args)?;
    Ok(())
}

fn benchmark_encode(fbb: &mut Builder, args: &PacketArgs<'_>, iterations: usize) -> Result<()> {
    println!("📊 Encode Benchmark (Command<Packet>)");
    println!("-------------------------------------");

    let mut total_bytes = 0usize;
    let start = Instant::now();
    for i in 0..iterations {
        let args = PacketArgs {
            id: i as u32,
            ..*args
        };
        total_bytes += encode_packet_command(fbb, &args, false)?.len();
    }
    let duration = start.elapsed();

    let ns = duration.as_nanos() as f64 / iterations.max(1) as f64;
    println!("  Operations: {}", iterations);
    println!("  Buffer size: {} bytes", total_bytes / iterations.max(1));
    println!("  Encode latency: {:.2} ns/op ({:.3} μs/op)", ns, ns / 1000.0);
    println!(
        "  Throughput:     {:.2} M msgs/sec\n",
        iterations as f64 / duration.as_secs_f64() / 1_000_000.0
    );
    Ok(())
}

fn benchmark_decode(sample: &[u8], iterations: usize) {
    println!("📊 Decode Benchmark (lazy field access)");
    println!("---------------------------------------");

    let mut checksum = 0u64;
    let start = Instant::now();
    for _ in 0..iterations {
        let command = root_as_command(sample);
        if let Some(packet) = command.command_as_packet() {
            checksum = checksum
                .wrapping_add(packet.process_id().unwrap_or(0))
                .wrapping_add(packet.remote_port() as u64)
                .wrapping_add(packet.remote_ip().map_or(0, |ip| ip.get(0) as u64));
        }
    }
    let duration = start.elapsed();

    let ns = duration.as_nanos() as f64 / iterations.max(1) as f64;
    println!("  Operations: {}", iterations);
    println!("  Decode latency: {:.2} ns/op ({:.3} μs/op)", ns, ns / 1000.0);
    println!("  Checksum: {:#x}\n", checksum);
}

fn benchmark_mutate(sample: &[u8], iterations: usize) {
    println!("📊 In-Place Mutation Benchmark");
    println!("------------------------------");

    let mut buf = sample.to_vec();
    let start = Instant::now();
    for i in 0..iterations {
        if let Some(mut packet) = root_as_command_mut(&mut buf).packet_mut() {
            packet.mutate_local_port(i as u16 | 1);
        }
    }
    let duration = start.elapsed();

    let ns = duration.as_nanos() as f64 / iterations.max(1) as f64;
    println!("  Operations: {}", iterations);
    println!("  Mutate latency: {:.2} ns/op ({:.3} μs/op)\n", ns, ns / 1000.0);
}

fn benchmark_frames(fbb: &mut Builder, args: &PacketArgs<'_>) -> Result<()> {
    println!("📊 Size-Prefixed Stream (10 frames)");
    println!("-----------------------------------");

    let mut stream = Vec::new();
    for i in 0..10 {
        let args = PacketArgs { id: i, ..*args };
        stream.extend_from_slice(encode_packet_command(fbb, &args, true)?);
    }

    let ids: Vec<u32> = FrameReader::new(&stream)
        .filter_map(|frame| size_prefixed_root_as_command(frame).command_as_packet())
        .map(|packet| packet.id())
        .collect();

    println!("  Stream bytes: {}", stream.len());
    println!("  Frames decoded: {} (ids {:?})", ids.len(), ids);
    Ok(())
}
