use crate::{lex::Lex, position::Code};
use std::fmt::{Debug, Display, Formatter};

/// Debug-only verbosity levels for tracing lexeme and grammar decisions.
///
/// `Log` carries an arbitrary label `T` (typically a `&'static str` naming
/// the lexeme or production) alongside the chosen verbosity. All tracing
/// driven by this type is compiled out entirely in release builds; it costs
/// nothing unless `cfg(debug_assertions)` is active.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Log<T> {
    None,
    Default(T),
    Success(T),
    Result(T),
    Verbose(T),
}

impl<T: Display> Display for Log<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Log::None => Ok(()),
            Log::Default(s) | Log::Success(s) | Log::Result(s) | Log::Verbose(s) => {
                write!(f, "{}", s)
            }
        }
    }
}

impl<T> Log<T> {
    fn order(&self) -> u8 {
        match self {
            Log::None => 0,
            Log::Default(_) => 1,
            Log::Success(_) => 2,
            Log::Result(_) => 3,
            Log::Verbose(_) => 4,
        }
    }
}

impl<TL: Display> Log<TL> {
    /// Trace a lexeme's match attempt at `index`, reporting success or
    /// failure depending on the configured verbosity. A no-op in release
    /// builds.
    pub fn trace_lexeme<T: Debug>(
        &self,
        index: usize,
        result: Option<&Lex<T>>,
        code: &Code,
    ) {
        #[cfg(debug_assertions)]
        match result {
            Some(data) => {
                if self.order() >= Log::Success(()).order() {
                    println!(
                        "[{}; LexemeSuccess]: token: {:?} at {}",
                        self,
                        data.token,
                        code.obtain_position(data.start)
                    )
                }
            }
            None => {
                if self.order() >= Log::Result(()).order() {
                    println!(
                        "[{}; LexemeError]: at {}",
                        self,
                        code.obtain_position(index)
                    )
                }
            }
        }
        #[cfg(not(debug_assertions))]
        {
            let _ = (index, result, code);
        }
    }

    /// Trace a grammar production's decision to accept or reject the token
    /// at `index`. A no-op in release builds.
    pub fn trace_production(&self, index: usize, accepted: bool, detail: &str, code: &Code) {
        #[cfg(debug_assertions)]
        {
            if accepted {
                if self.order() >= Log::Success(()).order() {
                    println!(
                        "[{}; ProductionMatch]: {} at {}",
                        self,
                        detail,
                        code.obtain_position(index)
                    )
                }
            } else if self.order() >= Log::Result(()).order() {
                println!(
                    "[{}; ProductionMiss]: {} at {}",
                    self,
                    detail,
                    code.obtain_position(index)
                )
            }
        }
        #[cfg(not(debug_assertions))]
        {
            let _ = (index, accepted, detail, code);
        }
    }
}
