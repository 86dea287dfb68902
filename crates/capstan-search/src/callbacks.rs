// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! User-supplied evaluation callbacks.
//!
//! Selectors and metaheuristics call user callbacks many times along a
//! search path and across backtracks, so a callback must be repeatable:
//! the same arguments always produce the same result. The wrapper types
//! here carry that promise as an explicit tag, checked once at
//! registration; a non-repeatable callback passed where a repeatable one
//! is required is a construction-time panic, not a runtime surprise.

use std::rc::Rc;

macro_rules! evaluator {
    ($(#[$doc:meta])* $name:ident, ($($arg:ident: $ty:ty),+)) => {
        $(#[$doc])*
        #[derive(Clone)]
        pub struct $name {
            f: Rc<dyn Fn($($ty),+) -> i64>,
            repeatable: bool,
        }

        impl $name {
            /// Wraps a callback promising repeatable results.
            pub fn repeatable<F>(f: F) -> Self
            where
                F: Fn($($ty),+) -> i64 + 'static,
            {
                Self {
                    f: Rc::new(f),
                    repeatable: true,
                }
            }

            /// Wraps a callback without the repeatable promise. Such a
            /// callback cannot be registered with selectors or
            /// metaheuristics.
            pub fn non_repeatable<F>(f: F) -> Self
            where
                F: Fn($($ty),+) -> i64 + 'static,
            {
                Self {
                    f: Rc::new(f),
                    repeatable: false,
                }
            }

            #[inline]
            pub fn run(&self, $($arg: $ty),+) -> i64 {
                (self.f)($($arg),+)
            }

            #[inline]
            pub fn is_repeatable(&self) -> bool {
                self.repeatable
            }

            /// Asserts the repeatable tag at registration time.
            ///
            /// # Panics
            ///
            /// Panics if the callback was not created with `repeatable`.
            pub fn check_is_repeatable(&self, context: &str) {
                assert!(
                    self.repeatable,
                    "called `{}` with a non-repeatable callback",
                    context
                );
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}(repeatable: {})", stringify!($name), self.repeatable)
            }
        }
    };
}

evaluator!(
    /// A unary index evaluator, e.g. the cost of branching on a variable.
    Evaluator1,
    (a: i64)
);

evaluator!(
    /// A binary evaluator over `(variable index, value)` pairs.
    Evaluator2,
    (a: i64, b: i64)
);

evaluator!(
    /// A ternary evaluator over `(variable index, value, secondary value)`.
    Evaluator3,
    (a: i64, b: i64, c: i64)
);

/// A callback producing an extra line for the search log at solutions.
#[derive(Clone)]
pub struct DisplayCallback {
    f: Rc<dyn Fn() -> String>,
    repeatable: bool,
}

impl DisplayCallback {
    pub fn repeatable<F>(f: F) -> Self
    where
        F: Fn() -> String + 'static,
    {
        Self {
            f: Rc::new(f),
            repeatable: true,
        }
    }

    pub fn non_repeatable<F>(f: F) -> Self
    where
        F: Fn() -> String + 'static,
    {
        Self {
            f: Rc::new(f),
            repeatable: false,
        }
    }

    #[inline]
    pub fn run(&self) -> String {
        (self.f)()
    }

    /// # Panics
    ///
    /// Panics if the callback was not created with `repeatable`.
    pub fn check_is_repeatable(&self, context: &str) {
        assert!(
            self.repeatable,
            "called `{}` with a non-repeatable callback",
            context
        );
    }
}

impl std::fmt::Debug for DisplayCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DisplayCallback(repeatable: {})", self.repeatable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_passes_arguments_through() {
        let eval = Evaluator2::repeatable(|a, b| a * 10 + b);
        assert_eq!(eval.run(3, 4), 34);
    }

    #[test]
    fn test_repeatable_tag() {
        let ok = Evaluator1::repeatable(|a| a);
        ok.check_is_repeatable("Phase::with_variable_evaluator");

        let bad = Evaluator1::non_repeatable(|a| a);
        assert!(!bad.is_repeatable());
    }

    #[test]
    #[should_panic(expected = "with a non-repeatable callback")]
    fn test_non_repeatable_registration_panics() {
        let bad = Evaluator2::non_repeatable(|a, b| a + b);
        bad.check_is_repeatable("Phase::with_value_evaluator");
    }
}
