// Status sink trait for operator-facing messages
use crate::domain::status::StatusLine;

pub trait StatusSink: Send + Sync {
    fn publish(&self, status: String);

    fn publish_line(&self, line: StatusLine) {
        self.publish(line.to_string());
    }
}
