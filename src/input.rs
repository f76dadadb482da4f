use levelgate_core::Level;

/// One input line split into its parts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogLine<'a> {
    pub level: Level,
    pub logger: &'a str,
    pub message: &'a str,
}

impl<'a> LogLine<'a> {
    /// Parse `LEVEL LOGGER [MESSAGE...]`, `None` if the level or logger is missing
    pub fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim_start();
        let (level, rest) = line.split_once(char::is_whitespace)?;
        let level = Level::from_name(level)?;

        let rest = rest.trim_start();
        let (logger, message) = match rest.split_once(char::is_whitespace) {
            Some((logger, message)) => (logger, message.trim_start()),
            None => (rest, ""),
        };
        if logger.is_empty() {
            return None;
        }

        Some(Self {
            level,
            logger,
            message,
        })
    }

    /// Values of `key=value` tokens in the message
    pub fn field(&self, key: &str) -> Option<&'a str> {
        self.message
            .split_whitespace()
            .filter_map(|token| token.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}
