// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! SCSI pass-through: submit one CDB plus a 512-byte data block to the
//! generic SCSI device of the USB2642 and report what came back.

use std::time::Duration;

use crate::error::Result;

/// Fixed-format sense data helpers.
pub mod sense;
/// Linux `SG_IO` implementation of [`ScsiTransport`].
pub mod sg;

/// Every vendor CDB of the bridge is 16 bytes long.
pub const CDB_LEN: usize = 16;
/// The data phase always moves one full block, whatever the payload size.
pub const DATA_LEN: usize = 512;
/// Size of the sense buffer handed to the kernel.
pub const SENSE_LEN: usize = 64;
/// Per-command timeout used unless the configuration overrides it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

pub type Cdb = [u8; CDB_LEN];
pub type DataBlock = [u8; DATA_LEN];

/// `dxfer_direction` values from `<scsi/sg.h>`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DxferDirection {
    None = -1,
    ToDevice = -2,
    FromDevice = -3,
}

/// Outcome of a transfer that ended with GOOD status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub status: u8,
    /// The part of the sense buffer the device actually wrote.
    pub sense: Vec<u8>,
    /// `dxfer_len` minus the number of bytes really transferred.
    pub residual: i32,
}

/// One synchronous CDB round-trip.
///
/// Implementations must return [`MuxError::I2cTransactionFailed`] when the
/// SCSI status is not GOOD and [`MuxError::TransportIoctl`] when the request
/// could not be delivered at all. They never retry.
///
/// [`MuxError::I2cTransactionFailed`]: crate::error::MuxError::I2cTransactionFailed
/// [`MuxError::TransportIoctl`]: crate::error::MuxError::TransportIoctl
pub trait ScsiTransport {
    fn submit(
        &mut self,
        cdb: &Cdb,
        direction: DxferDirection,
        data: &mut DataBlock,
    ) -> Result<Completion>;
}

impl<T: ScsiTransport + ?Sized> ScsiTransport for &mut T {
    fn submit(
        &mut self,
        cdb: &Cdb,
        direction: DxferDirection,
        data: &mut DataBlock,
    ) -> Result<Completion> {
        (**self).submit(cdb, direction, data)
    }
}

impl<T: ScsiTransport + ?Sized> ScsiTransport for Box<T> {
    fn submit(
        &mut self,
        cdb: &Cdb,
        direction: DxferDirection,
        data: &mut DataBlock,
    ) -> Result<Completion> {
        (**self).submit(cdb, direction, data)
    }
}
