//! In-process relay demo
//!
//! Run with: cargo run --example loopback
//!
//! A synthetic publisher pushes a 25 fps stream into `live/demo`. One viewer
//! attaches from the start, a second joins late and receives the cached GOP
//! first. Halfway through a second publisher takes the key over; the viewers
//! keep playing on a continued timeline.

use std::sync::Arc;
use std::time::Duration;

use rtmp_relay::server::supervise;
use rtmp_relay::session::{
    ChannelSink, ChannelSource, SessionConfig, SinkInfo, SinkReceiver, SourceFeeder, SourceInfo,
};
use rtmp_relay::{PacketSource, Packet, RegistryConfig, StreamRegistry};

const KEY: &str = "live/demo";
const FRAME_MS: u32 = 40;
const GOP_FRAMES: u32 = 25;

/// Push `frames` synthetic AVC frames, keyframe every GOP
async fn publish(feeder: SourceFeeder, frames: u32) -> rtmp_relay::Result<()> {
    feeder
        .send(Packet::video(0, vec![0x17, 0x00, 0x00, 0x00, 0x00]))
        .await?;
    feeder
        .send(Packet::audio(0, vec![0xAF, 0x00, 0x12, 0x10]))
        .await?;

    for i in 0..frames {
        let head = if i % GOP_FRAMES == 0 { 0x17 } else { 0x27 };
        feeder
            .send(Packet::video(i * FRAME_MS, vec![head, 0x01, 0x00, 0x00, 0x00]))
            .await?;
        tokio::time::sleep(Duration::from_millis(FRAME_MS as u64)).await;
    }
    Ok(())
}

/// Drain a viewer and report what it saw
async fn watch(name: &'static str, mut rx: SinkReceiver) -> rtmp_relay::Result<()> {
    let mut count = 0u64;
    let mut last_ts = 0u32;
    while let Some(packet) = rx.recv().await {
        if count == 0 {
            println!("[{}] first packet: {:?} ts={}", name, packet.kind, packet.timestamp);
        }
        count += 1;
        last_ts = packet.timestamp;
    }
    println!(
        "[{}] ended after {} packets, last ts={}, reason={:?}",
        name,
        count,
        last_ts,
        rx.close_reason()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rtmp_relay=debug".parse()?)
                .add_directive("loopback=debug".parse()?),
        )
        .init();

    let registry = Arc::new(StreamRegistry::with_config(
        RegistryConfig::default().sweep_interval(Duration::from_secs(1)),
    ));
    registry.start();

    let session = SessionConfig::default();

    let (early, early_rx) = ChannelSink::new(SinkInfo::new("viewer-early", KEY), session.clone());
    registry.handle_subscribe(early.clone()).await;
    supervise("viewer-early", move |_| {}, watch("viewer-early", early_rx));

    let (first, first_feeder) = ChannelSource::new(SourceInfo::new("encoder-a", KEY), session.clone());
    registry.handle_publish(first.clone()).await?;
    let first_task = supervise(
        "encoder-a",
        move |reason| first.close(reason),
        publish(first_feeder, 100),
    );

    tokio::time::sleep(Duration::from_millis(700)).await;
    let (late, late_rx) = ChannelSink::new(SinkInfo::new("viewer-late", KEY), session.clone());
    registry.handle_subscribe(late.clone()).await;
    supervise("viewer-late", move |_| {}, watch("viewer-late", late_rx));

    tokio::time::sleep(Duration::from_secs(1)).await;
    println!("status: {}", registry.status().await.to_json()?);

    // Different publisher UID: takeover
    let (second, second_feeder) = ChannelSource::new(SourceInfo::new("encoder-b", KEY), session.clone());
    registry.handle_publish(second.clone()).await?;
    let _ = first_task.await;
    let second_task = supervise(
        "encoder-b",
        move |reason| second.close(reason),
        publish(second_feeder, 50),
    );

    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("status: {}", registry.status().await.to_json()?);
    let _ = second_task.await;

    // Let the sweep notice the publisher went away
    tokio::time::sleep(Duration::from_secs(2)).await;
    if let Ok(stream) = registry.lookup(&KEY.into()).await {
        let stats = stream.stats().await;
        println!(
            "stream {}: running={} in={} out={} evicted={}",
            stats.stream_key, stats.running, stats.packets_in, stats.packets_out, stats.sinks_evicted
        );
    }

    registry.stop();
    Ok(())
}
