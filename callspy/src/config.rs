use std::{borrow::Cow, fmt, rc::Rc};

use crate::{
    equality::{Equality, StructuralEquality},
    format::{DefaultFormatter, ValueFormatter},
};

/// Configuration shared by every spy a [`Tracker`](crate::Tracker) creates.
///
/// Controls how values are rendered and compared, the fallback display name,
/// and whether call sites are captured. Use the builder methods to
/// customize, or use [`Default`].
///
/// # Examples
///
/// ```rust
/// use callspy::{Config, Tracker};
///
/// let config = Config::default()
///     .with_default_name("fake")       // Name used when nothing else is known
///     .with_capture_call_site(false);  // Skip caller locations
///
/// let tracker = Tracker::with_config(config);
/// assert_eq!(tracker.spy().display_name(), "fake");
/// ```
#[derive(Clone)]
pub struct Config {
    formatter: Rc<dyn ValueFormatter>,
    equality: Rc<dyn Equality>,
    default_name: Cow<'static, str>,
    capture_call_site: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            formatter: Rc::new(DefaultFormatter),
            equality: Rc::new(StructuralEquality),
            default_name: Cow::Borrowed("spy"),
            capture_call_site: true,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("default_name", &self.default_name)
            .field("capture_call_site", &self.capture_call_site)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Set the formatter used for rendered calls and error messages.
    pub fn with_formatter(mut self, formatter: impl ValueFormatter + 'static) -> Self {
        self.formatter = Rc::new(formatter);
        self
    }

    pub fn formatter(&self) -> &dyn ValueFormatter {
        &*self.formatter
    }

    /// Set the deep equality engine behind every argument, receiver and
    /// return value comparison.
    pub fn with_equality(mut self, equality: impl Equality + 'static) -> Self {
        self.equality = Rc::new(equality);
        self
    }

    pub fn equality(&self) -> &dyn Equality {
        &*self.equality
    }

    /// Set the display name used when a spy has neither an explicit nor an
    /// inferred name.
    /// Default: `"spy"`
    pub fn with_default_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.default_name = name.into();
        self
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Record the source location of every tracked call.
    /// Default: `true`
    pub fn with_capture_call_site(mut self, capture: bool) -> Self {
        self.capture_call_site = capture;
        self
    }

    pub fn capture_call_site(&self) -> bool {
        self.capture_call_site
    }
}
