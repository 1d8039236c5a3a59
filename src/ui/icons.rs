pub struct Icons;

impl Icons {
    pub const QR: &str = "🔳";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const DATABASE: &str = "🗄️";
    pub const KEY: &str = "🔑";
}
