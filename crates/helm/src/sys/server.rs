use crate::events::{AppEvent, LinkRequest};
use crate::geometry::Point;
use crate::interaction::{PointerEvent, PointerId, PointerPhase, SlotIndex};
use async_channel::Sender;
use std::path::PathBuf;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UnixListener;

/// Line protocol, one command per line:
///
/// ```text
/// down|move|up <pointer> <x> <y>
/// cancel <pointer>
/// remove <slot>
/// edit | dump | messages | clear-messages | reload | connect | disconnect | test
/// ```
///
/// Pointer events are stamped with the time the line was read. Coordinates must be finite.
pub fn parse_line(line: &str, now: Instant) -> Option<AppEvent> {
    let mut words = line.split_whitespace();
    let command = words.next()?.to_ascii_lowercase();
    let args: Vec<&str> = words.collect();

    let event = match (command.as_str(), args.as_slice()) {
        ("down" | "move" | "up", [pointer, x, y]) => {
            let phase: PointerPhase = command.parse().ok()?;
            let position = Point::new(coordinate(x)?, coordinate(y)?);
            AppEvent::Pointer(PointerEvent::new(pointer_id(pointer)?, phase, position, now))
        }
        ("cancel", [pointer]) => AppEvent::Pointer(PointerEvent::new(
            pointer_id(pointer)?,
            PointerPhase::Cancel,
            Point::default(),
            now,
        )),
        ("remove", [slot]) => AppEvent::Remove(slot.parse::<SlotIndex>().ok()?),
        ("edit", []) => AppEvent::ToggleEdit,
        ("dump", []) => AppEvent::Dump,
        ("messages", []) => AppEvent::Messages,
        ("clear-messages", []) => AppEvent::ClearMessages,
        ("reload", []) => AppEvent::ConfigReload,
        ("connect", []) => AppEvent::Link(LinkRequest::Connect),
        ("disconnect", []) => AppEvent::Link(LinkRequest::Disconnect),
        ("test", []) => AppEvent::Link(LinkRequest::Test),
        _ => return None,
    };
    Some(event)
}

fn pointer_id(raw: &str) -> Option<PointerId> {
    raw.parse::<u32>().ok().map(PointerId::from)
}

fn coordinate(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub async fn run_server(path: PathBuf, tx: Sender<AppEvent>) {
    // Cleanup old socket if it exists
    if fs_err::metadata(&path).is_ok() {
        let _ = fs_err::remove_file(&path);
    }

    let listener = match UnixListener::bind(&path) {
        Ok(l) => l,
        Err(e) => {
            log::error!("Failed to bind unix socket {}: {}", path.display(), e);
            return;
        }
    };
    log::info!("Listening for input on {}", path.display());

    loop {
        match listener.accept().await {
            Ok((mut stream, _)) => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let reader = BufReader::new(&mut stream);
                    let mut lines = reader.lines();

                    while let Ok(Some(line)) = lines.next_line().await {
                        match parse_line(&line, Instant::now()) {
                            Some(event) => {
                                if tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            None if line.trim().is_empty() => {}
                            None => log::warn!("Ignoring malformed command: {}", line.trim()),
                        }
                    }
                });
            }
            Err(e) => {
                log::error!("Failed to accept connection: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pointer(event: Option<AppEvent>) -> PointerEvent {
        match event {
            Some(AppEvent::Pointer(p)) => p,
            other => panic!("expected pointer event, got {other:?}"),
        }
    }

    #[test]
    fn test_pointer_lines() {
        let now = Instant::now();

        let down = pointer(parse_line("down 1 120.5 80", now));
        assert_eq!(down.pointer, PointerId::from(1));
        assert_eq!(down.phase, PointerPhase::Down);
        assert_eq!(down.position, Point::new(120.5, 80.0));
        assert_eq!(down.time, now);

        assert_eq!(pointer(parse_line("  MOVE 2 1 2 ", now)).phase, PointerPhase::Move);
        assert_eq!(pointer(parse_line("up 1 0 0", now)).phase, PointerPhase::Up);
        assert_eq!(pointer(parse_line("cancel 3", now)).phase, PointerPhase::Cancel);
    }

    #[test]
    fn test_command_lines() {
        let now = Instant::now();
        assert!(matches!(
            parse_line("remove right-1", now),
            Some(AppEvent::Remove(slot)) if slot.as_index() == 5
        ));
        assert!(matches!(parse_line("edit", now), Some(AppEvent::ToggleEdit)));
        assert!(matches!(parse_line("dump", now), Some(AppEvent::Dump)));
        assert!(matches!(parse_line("messages", now), Some(AppEvent::Messages)));
        assert!(matches!(
            parse_line("CLEAR-MESSAGES", now),
            Some(AppEvent::ClearMessages)
        ));
        assert!(matches!(
            parse_line("connect", now),
            Some(AppEvent::Link(LinkRequest::Connect))
        ));
        assert!(matches!(
            parse_line("test", now),
            Some(AppEvent::Link(LinkRequest::Test))
        ));
    }

    #[test]
    fn test_malformed_lines_are_rejected() {
        let now = Instant::now();
        for line in [
            "",
            "down 1 10",
            "down x 10 10",
            "move 1 ten 10",
            "down 1 NaN 10",
            "move 1 10 inf",
            "up 1 -infinity 0",
            "remove 8",
            "edit now",
            "show",
        ] {
            assert!(parse_line(line, now).is_none(), "accepted {line:?}");
        }
    }
}
