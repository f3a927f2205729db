//! Generic `HapticLink` trait for the wireless link that carries frequency
//! commands to the wearable actuator array.

use ecuity_types::EcuityError;

/// A point-to-point link to the haptic actuator controller.
///
/// Sends are fire-and-forget: the controller does not acknowledge commands
/// and nothing is retried.
pub trait HapticLink {
    /// Stable identifier for this link, e.g. `"vest_bt"`.
    fn id(&self) -> &str;

    /// Return `true` while the link is connected.
    fn is_connected(&self) -> bool;

    /// Transmit one serialized frequency command.
    ///
    /// # Errors
    ///
    /// Returns [`EcuityError::Transport`] if the payload cannot be handed to
    /// the link (e.g. it dropped between the connection check and the send).
    fn send(&mut self, payload: &str) -> Result<(), EcuityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockLink {
        id: String,
        connected: bool,
        last: Option<String>,
    }

    impl HapticLink for MockLink {
        fn id(&self) -> &str {
            &self.id
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn send(&mut self, payload: &str) -> Result<(), EcuityError> {
            if !self.connected {
                return Err(EcuityError::Transport {
                    link: self.id.clone(),
                    details: "not connected".to_string(),
                });
            }
            self.last = Some(payload.to_string());
            Ok(())
        }
    }

    #[test]
    fn mock_link_send_and_disconnect() {
        let mut link = MockLink {
            id: "vest_bt".to_string(),
            connected: true,
            last: None,
        };
        link.send("21").unwrap();
        assert_eq!(link.last.as_deref(), Some("21"));

        link.connected = false;
        assert!(!link.is_connected());
        assert!(matches!(
            link.send("00"),
            Err(EcuityError::Transport { .. })
        ));
    }
}
