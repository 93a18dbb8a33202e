use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::broadcast;

use nakama_realtime::{ChannelJoinType, Conn, Event, proto};

pub async fn ping(conn: &Conn) -> Result<()> {
    let start = Instant::now();
    conn.call(proto::Ping::new()).await.context("ping failed")?;
    println!("pong in {:.1} ms", start.elapsed().as_secs_f64() * 1000.0);
    Ok(())
}

pub async fn rpc(conn: &Conn, id: &str, payload: Option<String>) -> Result<()> {
    let mut request = proto::Rpc::new(id);
    if let Some(payload) = payload {
        request = request.with_payload(payload);
    }
    let reply = conn
        .call(request)
        .await
        .with_context(|| format!("rpc {id} failed"))?;

    match serde_json::from_str::<serde_json::Value>(&reply.payload) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", reply.payload),
    }
    Ok(())
}

pub async fn join(conn: &Conn, target: &str, kind: ChannelJoinType, persist: bool) -> Result<()> {
    let mut events = conn.subscribe();
    let channel = conn
        .call(proto::ChannelJoin::new(target, kind).with_persistence(persist))
        .await
        .with_context(|| format!("failed to join {target}"))?;

    println!("joined {} ({} present)", channel.id, channel.presences.len());
    for p in &channel.presences {
        println!("  {} ({})", p.username, p.user_id);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(Event::ChannelMessage(m)) if m.channel_id == channel.id => {
                    println!("{}: {}", m.username, m.content);
                }
                Ok(Event::ChannelPresence(e)) if e.channel_id == channel.id => {
                    for p in &e.joins {
                        println!("+ {}", p.username);
                    }
                    for p in &e.leaves {
                        println!("- {}", p.username);
                    }
                }
                Ok(Event::Disconnected) | Err(broadcast::error::RecvError::Closed) => {
                    println!("connection closed by server");
                    return Ok(());
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    eprintln!("skipped {n} events");
                }
            },
        }
    }

    conn.call(proto::ChannelLeave::new(&channel.id))
        .await
        .context("failed to leave channel")?;
    Ok(())
}

pub async fn listen(conn: &Conn) -> Result<()> {
    let mut events = conn.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            event = events.recv() => match event {
                Ok(Event::Disconnected) | Err(broadcast::error::RecvError::Closed) => {
                    println!("connection closed by server");
                    return Ok(());
                }
                Ok(event) => {
                    if let Some((kind, json)) = describe(&event)? {
                        println!("{kind} {json}");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    eprintln!("skipped {n} events");
                }
            },
        }
    }
}

/// Kind and JSON body of a push, `None` for lifecycle events.
fn describe(event: &Event) -> Result<Option<(&'static str, String)>> {
    let described = match event {
        Event::Connected | Event::Disconnected => return Ok(None),
        Event::Error(e) => ("error", serde_json::to_string(e)?),
        Event::ChannelMessage(m) => ("channel_message", serde_json::to_string(m)?),
        Event::ChannelPresence(m) => ("channel_presence_event", serde_json::to_string(m)?),
        Event::MatchData(m) => ("match_data", serde_json::to_string(m)?),
        Event::MatchPresence(m) => ("match_presence_event", serde_json::to_string(m)?),
        Event::MatchmakerMatched(m) => ("matchmaker_matched", serde_json::to_string(m)?),
        Event::Notifications(m) => ("notifications", serde_json::to_string(m)?),
        Event::StatusPresence(m) => ("status_presence_event", serde_json::to_string(m)?),
        Event::StreamData(m) => ("stream_data", serde_json::to_string(m)?),
        Event::StreamPresence(m) => ("stream_presence_event", serde_json::to_string(m)?),
    };
    Ok(Some(described))
}
