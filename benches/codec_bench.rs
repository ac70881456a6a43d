//! Criterion benchmark untuk Buffer Codec
//!
//! Run dengan: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use kextwire::protocol::{
    encode_packet_command, root_as_command, root_as_command_mut, Direction, IpProtocol, PacketArgs,
};
use kextwire::Builder;

const LOCAL_V4: [u32; 1] = [0xC0A8_0102];
const REMOTE_V4: [u32; 1] = [0x5DB8_D822];
const LOCAL_V6: [u32; 4] = [0xFE80_0000, 0, 0, 1];
const REMOTE_V6: [u32; 4] = [0x2001_0DB8, 0, 0, 0x42];

fn args<'a>(local: &'a [u32], remote: &'a [u32], ip_v6: bool) -> PacketArgs<'a> {
    PacketArgs {
        id: 1,
        process_id: Some(4321),
        process_path: Some(&b"/usr/lib/firefox/firefox"[..]),
        direction: Direction::Outbound as u8,
        ip_v6,
        protocol: IpProtocol::Tcp as u8,
        local_ip: Some(local),
        remote_ip: Some(remote),
        local_port: 49152,
        remote_port: 443,
    }
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Elements(1));

    // Builder di-reuse, vtable cache di-reset tiap encode
    group.bench_function("packet_command_v4", |b| {
        let mut fbb = Builder::with_capacity(256);
        let args = args(&LOCAL_V4, &REMOTE_V4, false);
        b.iter(|| {
            let buf = encode_packet_command(&mut fbb, black_box(&args), false).unwrap();
            black_box(buf.len());
        });
    });

    group.bench_function("packet_command_v6_size_prefixed", |b| {
        let mut fbb = Builder::with_capacity(256);
        let args = args(&LOCAL_V6, &REMOTE_V6, true);
        b.iter(|| {
            let buf = encode_packet_command(&mut fbb, black_box(&args), true).unwrap();
            black_box(buf.len());
        });
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(1));

    let mut fbb = Builder::new();
    let sample = encode_packet_command(&mut fbb, &args(&LOCAL_V4, &REMOTE_V4, false), false)
        .unwrap()
        .to_vec();

    group.bench_function("dispatch_and_read_ports", |b| {
        b.iter(|| {
            let command = root_as_command(black_box(&sample));
            let packet = command.command_as_packet().unwrap();
            black_box((packet.local_port(), packet.remote_port()));
        });
    });

    group.bench_function("read_all_fields", |b| {
        b.iter(|| {
            let packet = root_as_command(black_box(&sample))
                .command_as_packet()
                .unwrap();
            black_box((
                packet.id(),
                packet.process_id(),
                packet.process_path(),
                packet.direction(),
                packet.protocol(),
                packet.local_address(),
                packet.remote_address(),
            ));
        });
    });

    group.bench_function("mutate_local_port", |b| {
        let mut buf = sample.clone();
        let mut port = 0u16;
        b.iter(|| {
            let mut packet = root_as_command_mut(&mut buf).packet_mut().unwrap();
            port = port.wrapping_add(1) | 1;
            black_box(packet.mutate_local_port(port));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
