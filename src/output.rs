use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// `QRSTEG_QUIET=1` silences human status lines (errors still print)
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("QRSTEG_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}
