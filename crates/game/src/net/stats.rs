/// Counters for traffic and for every transport error the sockets swallow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub send_errors: u64,
    pub receive_errors: u64,
    pub decode_errors: u64,
    pub oversized_drops: u64,
}

impl NetStats {
    pub fn record_sent(&mut self, bytes: usize) {
        self.packets_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    pub fn record_received(&mut self, bytes: usize) {
        self.packets_received += 1;
        self.bytes_received += bytes as u64;
    }
}
