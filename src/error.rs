// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Error taxonomy shared by the transport, bridge, expander and mux layers.

use std::io;

use thiserror::Error;

use crate::{sd_regs::DecodeError, transport::sense::SenseSummary};

/// Library-wide result alias.
pub type Result<T, E = MuxError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum MuxError {
    /// Opening the sg device or the `SG_IO` ioctl itself failed.
    #[error("SG_IO ioctl() failed: {0}")]
    TransportIoctl(#[source] io::Error),

    /// The ioctl went through but the bridge reported a non-GOOD SCSI status.
    #[error(
        "SCSI transaction ended with status {status:#04x}, I2C transaction has probably failed{}",
        SenseSummary::describe(sense)
    )]
    I2cTransactionFailed { status: u8, sense: Vec<u8> },

    /// The ioctl returned but the adapter or the sg driver gave up on the
    /// command, e.g. after the timeout expired.
    #[error(
        "SG_IO command aborted (host_status {host_status:#06x}, driver_status {driver_status:#06x})"
    )]
    TransportAborted { host_status: u16, driver_status: u16 },

    /// A payload does not fit into the CDB inline field or the data phase.
    #[error("{what} is {len} bytes long, at most {max} bytes are allowed")]
    FrameLength {
        what: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Could not determine type of USB-SD-Mux. {0}")]
    UnknownUsbSdMuxRevision(String),

    #[error("card information is only available while the card is switched to the host")]
    NotInHostMode,

    #[error("{0} is not supported by this USB-SD-Mux revision")]
    UnsupportedOperation(&'static str),

    #[error("unknown user GPIO {0}, expected 0 or 1")]
    UnknownGpio(u8),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl MuxError {
    pub(crate) fn frame_length(what: &'static str, len: usize, max: usize) -> Self {
        MuxError::FrameLength { what, len, max }
    }
}
