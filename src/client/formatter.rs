//! Message formatting utilities for client display.

use crate::hub::message::ChatMessage;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a broadcast chat message for the terminal
    pub fn format_chat_message(message: &ChatMessage) -> String {
        format!(
            "\n@{}: {}\n  sent at {}\n",
            message.user, message.text, message.timestamp
        )
    }

    /// Format a raw text frame (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n<- Received: {}\n", text)
    }

    /// Format a binary frame notification
    pub fn format_binary_message(byte_count: usize) -> String {
        format!("\n<- Received {} bytes of binary data\n", byte_count)
    }
}
