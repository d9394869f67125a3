// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

#![deny(missing_docs)]

//! Audit trail for validation runs.
//!
//! Every validator in this crate records what it checked, and what it
//! found, into a [`StatusTracker`]. The tracker travels with the result
//! so callers can see exactly which check produced which reason code.

use std::fmt::Debug;

use log::{debug, warn};

/// A `StatusTracker` collects [`LogItem`]s produced while validating
/// certificates, trust chains, CRLs and security objects, and decides
/// whether a failure stops the run or is merely recorded.
#[derive(Clone, Debug, Default)]
pub struct StatusTracker {
    error_behavior: ErrorBehavior,
    logged_items: Vec<LogItem>,
    scopes: Vec<String>,
}

impl StatusTracker {
    /// Returns a [`StatusTracker`] with the specified [`ErrorBehavior`].
    pub fn with_error_behavior(error_behavior: ErrorBehavior) -> Self {
        Self {
            error_behavior,
            logged_items: vec![],
            scopes: vec![],
        }
    }

    /// Returns the current list of validation log items.
    pub fn logged_items(&self) -> &[LogItem] {
        &self.logged_items
    }

    /// Consumes the tracker and returns its log items.
    pub fn into_items(self) -> Vec<LogItem> {
        self.logged_items
    }

    /// Appends the contents of another [`StatusTracker`] to this one.
    ///
    /// Items keep their original kind; the current scope, if any, is
    /// applied to items that were recorded without one.
    pub fn append(&mut self, other: &StatusTracker) {
        for log_item in other.logged_items() {
            let mut log_item = log_item.clone();
            self.apply_scope(&mut log_item);
            self.logged_items.push(log_item);
        }
    }

    /// Adds a non-error [`LogItem`] to this status tracker.
    ///
    /// Primarily intended for use by [`LogItem::success()`]
    /// or [`LogItem::informational()`].
    pub fn add_non_error(&mut self, mut log_item: LogItem) {
        self.apply_scope(&mut log_item);
        debug!("validation: {} {}", log_item.label, log_item.description);
        self.logged_items.push(log_item);
    }

    /// Adds an error-case [`LogItem`] to this status tracker.
    ///
    /// Will return `Err(err)` if configured to stop immediately on errors or
    /// `Ok(err)` if configured to continue on errors. _(See
    /// [`ErrorBehavior`].)_
    pub fn add_error<E>(&mut self, mut log_item: LogItem, err: E) -> Result<E, E> {
        self.apply_scope(&mut log_item);
        warn!(
            "validation failure: {} {} ({})",
            log_item.label,
            log_item.description,
            log_item.validation_status.as_deref().unwrap_or("-")
        );
        self.logged_items.push(log_item);

        match self.error_behavior {
            ErrorBehavior::StopOnFirstError => Err(err),
            ErrorBehavior::ContinueWhenPossible => Ok(err),
        }
    }

    /// Returns the [`LogItem`]s that have error conditions (`err_val` is
    /// populated).
    pub fn filter_errors(&self) -> impl Iterator<Item = &LogItem> {
        self.logged_items()
            .iter()
            .filter(|item| item.err_val.is_some())
    }

    /// Returns `true` if the log contains a specific validation status
    /// code.
    pub fn has_status(&self, val: &str) -> bool {
        self.logged_items()
            .iter()
            .any(|vi| vi.validation_status.as_deref() == Some(val))
    }

    /// Returns `true` if the log contains a specific error.
    pub fn has_error<E: Debug>(&self, err: E) -> bool {
        let err_type = format!("{:?}", &err);
        self.logged_items()
            .iter()
            .any(|vi| vi.err_val.as_deref() == Some(err_type.as_str()))
    }

    /// Returns `true` if the log contains any error.
    pub fn has_any_error(&self) -> bool {
        self.filter_errors().next().is_some()
    }

    /// Enters a named scope, such as `chain[1]` or `DG2`.
    ///
    /// Items logged without a label while the scope is active are
    /// labelled with it.
    pub fn push_scope<S: Into<String>>(&mut self, scope: S) {
        self.scopes.push(scope.into());
    }

    /// Leaves the innermost scope.
    pub fn pop_scope(&mut self) -> Option<String> {
        self.scopes.pop()
    }

    /// Returns the innermost scope, if any.
    pub fn current_scope(&self) -> Option<&str> {
        self.scopes.last().map(|s| s.as_str())
    }

    fn apply_scope(&self, log_item: &mut LogItem) {
        if log_item.label.is_empty() {
            if let Some(scope) = self.scopes.last() {
                log_item.label = std::borrow::Cow::Owned(scope.to_string());
            }
        }
    }
}

/// `ErrorBehavior` configures the behavior of [`StatusTracker`] when its
/// [`add_error`] function is called.
///
/// [`add_error`]: StatusTracker::add_error
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ErrorBehavior {
    /// If an error is encountered, stop validation immediately.
    StopOnFirstError,

    /// If an error is encountered, log it and continue validation as much as
    /// possible.
    #[default]
    ContinueWhenPossible,
}

mod log_item;
pub use log_item::{LogItem, LogKind};

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::unwrap_used)]

    use std::fmt::{self, Display, Formatter};

    mod detailed {
        use super::SampleError;
        use crate::{log_item, status_tracker::StatusTracker};

        #[test]
        fn aggregates_errors() {
            let mut tracker = StatusTracker::default();

            log_item!("chain[0]", "root is a CA", "validate").success(&mut tracker);

            // A failure does not stop the run by default.
            log_item!("chain[1]", "leaf expired", "validate")
                .validation_status("certificate.expired")
                .failure(&mut tracker, SampleError {})
                .unwrap();

            assert_eq!(tracker.logged_items().len(), 2);

            assert!(tracker.has_status("certificate.expired"));
            assert!(!tracker.has_status("certificate.revoked"));

            assert!(tracker.has_error(SampleError {}));
            assert!(!tracker.has_error("Something Else"));

            let errors: Vec<_> = tracker.filter_errors().collect();
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].label, "chain[1]");
        }

        #[test]
        fn append_keeps_both_trackers() {
            let mut outer = StatusTracker::default();
            let mut inner = StatusTracker::default();

            log_item!("DG1", "hash matches", "score").success(&mut outer);
            log_item!("DG2", "hash mismatch", "score")
                .failure(&mut inner, SampleError {})
                .unwrap();

            outer.append(&inner);

            assert_eq!(outer.logged_items().len(), 2);
            assert_eq!(inner.logged_items().len(), 1);
            assert!(outer.has_any_error());
        }

        #[test]
        fn scope_labels_unlabelled_items() {
            let mut tracker = StatusTracker::default();

            tracker.push_scope("chain[2]");
            log_item!("", "digitalSignature present", "validate").success(&mut tracker);
            log_item!("explicit", "kept", "validate").success(&mut tracker);
            assert_eq!(tracker.pop_scope().as_deref(), Some("chain[2]"));
            log_item!("", "outside", "validate").success(&mut tracker);

            let labels: Vec<_> = tracker
                .logged_items()
                .iter()
                .map(|i| i.label.to_string())
                .collect();
            assert_eq!(labels, vec!["chain[2]", "explicit", ""]);
        }
    }

    mod one_shot {
        use super::SampleError;
        use crate::{
            log_item,
            status_tracker::{ErrorBehavior, StatusTracker},
        };

        #[test]
        fn stops_on_first_error() {
            let mut tracker = StatusTracker::with_error_behavior(ErrorBehavior::StopOnFirstError);

            log_item!("sod", "signature verified", "verify").success(&mut tracker);

            let err = log_item!("DG2", "hash mismatch", "score")
                .failure(&mut tracker, SampleError {})
                .unwrap_err();

            assert_eq!(err, SampleError {});
            assert_eq!(tracker.logged_items().len(), 2);
        }
    }

    #[derive(Debug, Eq, PartialEq)]
    struct SampleError {}

    impl Display for SampleError {
        fn fmt(&self, f: &mut Formatter) -> fmt::Result {
            write!(f, "SampleError")
        }
    }
}
