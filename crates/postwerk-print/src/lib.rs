// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Postwerk Print — print dispatch (local utility or print-by-email) and the
// background upload to the public viewing service. This crate bridges the
// core domain types defined in `postwerk-core` and the rendered artifacts of
// `postwerk-document` to processes and HTTP APIs.

pub mod dispatch;
pub mod email;
pub mod local;
pub mod retry;
pub mod upload;

#[cfg(test)]
mod loopback;

pub use dispatch::{PrintChannel, PrintDispatcher, PrintJob};
pub use email::{EmailPrinter, MailTransport, SendGridMailer};
pub use local::{CommandRunner, LocalPrinter, ProcessRunner};
pub use retry::RetryConfig;
pub use upload::{ReqwestUploadTransport, RemoteUploadClient, UploadTransport};
