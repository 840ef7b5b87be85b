//! Message identifiers in the `<prefix>_<unix millis>_<9 base36 chars>` form.

use rand::Rng;

const SUFFIX_LEN: usize = 9;

/// Identifier for a message sent by the user.
pub fn user() -> String {
    generate("msg")
}

/// Identifier for a reply produced by the bot.
pub fn bot() -> String {
    generate("bot_msg")
}

fn generate(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .filter_map(|_| std::char::from_digit(rng.gen_range(0..36), 36))
        .collect();

    format!(
        "{}_{}_{}",
        prefix,
        chrono::Utc::now().timestamp_millis(),
        suffix
    )
}
