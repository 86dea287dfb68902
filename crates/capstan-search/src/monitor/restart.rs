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

//! Restart strategies.
//!
//! Both monitors count failures and, at a threshold, ask the driver to
//! restart the current search from its root. The Luby schedule grows the
//! threshold as `luby(i) * scale`; the constant schedule keeps it fixed.

use crate::monitor::SearchMonitor;
use capstan_engine::Solver;

/// The classical Luby sequence: `1, 1, 2, 1, 1, 2, 4, 1, 1, 2, 1, 1, 2,
/// 4, 8, 1, ...`.
///
/// # Panics
///
/// Panics if `i` is not positive.
pub fn luby(i: i64) -> i64 {
    assert!(i > 0, "called `luby` with i = {}", i);
    let mut i = i;
    loop {
        // Smallest power of two >= i + 1.
        let mut power: i64 = 2;
        while power < i + 1 {
            power <<= 1;
        }
        if power == i + 1 {
            return power / 2;
        }
        i -= power / 2 - 1;
    }
}

/// Restarts with thresholds following `luby(i) * scale_factor`.
pub struct LubyRestart {
    scale_factor: i64,
    iteration: i64,
    current_fails: i64,
    next_step: i64,
}

impl LubyRestart {
    /// # Panics
    ///
    /// Panics if `scale_factor < 1`.
    pub fn new(scale_factor: i64) -> Self {
        assert!(
            scale_factor >= 1,
            "called `LubyRestart::new` with scale factor {}, but it must be at least 1",
            scale_factor
        );
        Self {
            scale_factor,
            iteration: 1,
            current_fails: 0,
            next_step: scale_factor,
        }
    }
}

impl SearchMonitor for LubyRestart {
    fn name(&self) -> &str {
        "LubyRestart"
    }

    fn on_begin_fail(&mut self, solver: &mut Solver) {
        self.current_fails += 1;
        if self.current_fails >= self.next_step {
            self.current_fails = 0;
            self.iteration += 1;
            self.next_step = luby(self.iteration) * self.scale_factor;
            solver.restart_current_search();
        }
    }
}

impl std::fmt::Display for LubyRestart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LubyRestart({})", self.scale_factor)
    }
}

/// Restarts every `frequency` failures.
pub struct ConstantRestart {
    frequency: i64,
    current_fails: i64,
}

impl ConstantRestart {
    /// # Panics
    ///
    /// Panics if `frequency < 1`.
    pub fn new(frequency: i64) -> Self {
        assert!(
            frequency >= 1,
            "called `ConstantRestart::new` with frequency {}, but it must be at least 1",
            frequency
        );
        Self {
            frequency,
            current_fails: 0,
        }
    }
}

impl SearchMonitor for ConstantRestart {
    fn name(&self) -> &str {
        "ConstantRestart"
    }

    fn on_begin_fail(&mut self, solver: &mut Solver) {
        self.current_fails += 1;
        if self.current_fails >= self.frequency {
            self.current_fails = 0;
            solver.restart_current_search();
        }
    }
}

impl std::fmt::Display for ConstantRestart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConstantRestart({})", self.frequency)
    }
}
