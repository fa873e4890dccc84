// Communication channels lock-free

use crate::messaging::command::{AudioMessage, SessionCommand};
use crate::messaging::notification::Notification;
use ringbuf::{HeapRb, traits::Split};

pub type CommandProducer = ringbuf::HeapProd<SessionCommand>;
pub type CommandConsumer = ringbuf::HeapCons<SessionCommand>;

pub fn create_command_channel(capacity: usize) -> (CommandProducer, CommandConsumer) {
    let rb = HeapRb::<SessionCommand>::new(capacity);
    rb.split()
}

pub type AudioProducer = ringbuf::HeapProd<AudioMessage>;
pub type AudioConsumer = ringbuf::HeapCons<AudioMessage>;

pub fn create_audio_channel(capacity: usize) -> (AudioProducer, AudioConsumer) {
    let rb = HeapRb::<AudioMessage>::new(capacity);
    rb.split()
}

pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity);
    rb.split()
}
