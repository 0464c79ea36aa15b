//! ChannelObserver - 進捗を tokio の mpsc チャネルへ流す
//!
//! 受信側が先に drop された場合、イベントは黙って捨てられます。

use tokio::sync::mpsc;

use crate::domain::ProgressEvent;
use crate::ports::ProgressObserver;

#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, file_name: &str, percent: u8) {
        let _ = self.tx.send(ProgressEvent {
            file_name: file_name.to_string(),
            percent,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwards_events_in_order() {
        let (observer, mut rx) = ChannelObserver::new();
        observer.on_progress("a.png", 10);
        observer.on_progress("a.png", 100);
        drop(observer);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                ProgressEvent { file_name: "a.png".to_string(), percent: 10 },
                ProgressEvent { file_name: "a.png".to_string(), percent: 100 },
            ]
        );
    }

    #[test]
    fn closed_receiver_is_ignored() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.on_progress("a.png", 50);
    }
}
