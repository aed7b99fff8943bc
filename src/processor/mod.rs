pub mod message_processor;
