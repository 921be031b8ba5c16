// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    fs::{File, OpenOptions},
    io,
    os::fd::AsRawFd,
    path::{Path, PathBuf},
    ptr,
    time::Duration,
};

use nix::libc::{c_int, c_uchar, c_uint, c_ushort, c_void};
use tracing::{debug, warn};

use super::{
    Cdb, Completion, DEFAULT_TIMEOUT, DataBlock, DxferDirection, SENSE_LEN,
    ScsiTransport,
};
use crate::error::{MuxError, Result};

/// `SG_IO` request number from `<scsi/sg.h>`.
pub const SG_IO: u32 = 0x2285;
/// `interface_id` of a version 3 sg request.
pub const SG_INTERFACE_ID_ORIG: c_int = b'S' as c_int;

/// `DRIVER_SENSE`: sense data is valid, not a failure on its own.
const DRIVER_SENSE: c_ushort = 0x08;
/// Low nibble of `driver_status` holds the `DRIVER_*` code.
const DRIVER_CODE_MASK: c_ushort = 0x0F;

/// Mirror of the kernel's `sg_io_hdr_t`.
///
/// 88 bytes on LP64 (two padding holes: before `usr_ptr` and at the end),
/// 64 bytes on ILP32.
#[repr(C)]
#[derive(Debug)]
pub struct SgIoHdr {
    /// [i] 'S' for SCSI generic (required)
    pub interface_id: c_int,
    /// [i] data transfer direction
    pub dxfer_direction: c_int,
    /// [i] SCSI command length
    pub cmd_len: c_uchar,
    /// [i] max length to write to sbp
    pub mx_sb_len: c_uchar,
    /// [i] 0 implies no scatter gather
    pub iovec_count: c_ushort,
    /// [i] byte count of data transfer
    pub dxfer_len: c_uint,
    /// [i], [*io] points to data transfer memory
    pub dxferp: *mut c_void,
    /// [i], [*i] points to command to perform
    pub cmdp: *mut c_uchar,
    /// [i], [*o] points to sense_buffer memory
    pub sbp: *mut c_uchar,
    /// [i] unit: millisec
    pub timeout: c_uint,
    /// [i] 0 -> default, see SG_FLAG...
    pub flags: c_uint,
    /// [i->o] unused internally (normally)
    pub pack_id: c_int,
    /// [i->o] unused internally
    pub usr_ptr: *mut c_void,
    /// [o] scsi status
    pub status: c_uchar,
    /// [o] shifted, masked scsi status
    pub masked_status: c_uchar,
    /// [o] messaging level data (optional)
    pub msg_status: c_uchar,
    /// [o] byte count actually written to sbp
    pub sb_len_wr: c_uchar,
    /// [o] errors from host adapter
    pub host_status: c_ushort,
    /// [o] errors from software driver
    pub driver_status: c_ushort,
    /// [o] dxfer_len - actual_transferred
    pub resid: c_int,
    /// [o] time taken by cmd (unit: millisec)
    pub duration: c_uint,
    /// [o] auxiliary information
    pub info: c_uint,
}

const _: () = {
    #[cfg(target_pointer_width = "64")]
    assert!(std::mem::size_of::<SgIoHdr>() == 88, "sg_io_hdr_t must be 88 bytes");
    #[cfg(target_pointer_width = "32")]
    assert!(std::mem::size_of::<SgIoHdr>() == 64, "sg_io_hdr_t must be 64 bytes");
};

nix::ioctl_readwrite_bad!(sg_io, SG_IO, SgIoHdr);

impl SgIoHdr {
    /// Fill the header for one request. The pointers must stay valid until
    /// the ioctl returns.
    pub fn new(
        direction: DxferDirection,
        cdb: &mut Cdb,
        data: &mut DataBlock,
        sense: &mut [u8; SENSE_LEN],
        timeout: Duration,
    ) -> Self {
        Self {
            interface_id: SG_INTERFACE_ID_ORIG,
            dxfer_direction: direction as c_int,
            cmd_len: cdb.len() as c_uchar,
            mx_sb_len: sense.len() as c_uchar,
            iovec_count: 0,
            dxfer_len: data.len() as c_uint,
            dxferp: data.as_mut_ptr().cast(),
            cmdp: cdb.as_mut_ptr(),
            sbp: sense.as_mut_ptr(),
            timeout: u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX),
            flags: 0,
            pack_id: 0,
            usr_ptr: ptr::null_mut(),
            status: 0,
            masked_status: 0,
            msg_status: 0,
            sb_len_wr: 0,
            host_status: 0,
            driver_status: 0,
            resid: 0,
            duration: 0,
            info: 0,
        }
    }

    /// Map the header the kernel handed back to the outcome of the command.
    ///
    /// `sense` is the buffer `sbp` pointed at; only the `sb_len_wr` bytes
    /// the device wrote are kept.
    pub fn completion(&self, sense: &[u8]) -> Result<Completion> {
        let written = usize::from(self.sb_len_wr).min(sense.len());
        let sense = sense[..written].to_vec();

        if self.status != 0 {
            warn!(
                status = format_args!("{:#04x}", self.status),
                host_status = self.host_status,
                driver_status = self.driver_status,
                sense = %hex::encode(&sense),
                "bridge rejected CDB"
            );
            return Err(MuxError::I2cTransactionFailed {
                status: self.status,
                sense,
            });
        }

        let driver_code = self.driver_status & DRIVER_CODE_MASK;
        if self.host_status != 0 || (driver_code != 0 && driver_code != DRIVER_SENSE) {
            warn!(
                host_status = self.host_status,
                driver_status = self.driver_status,
                duration_ms = self.duration,
                "SG_IO command aborted"
            );
            return Err(MuxError::TransportAborted {
                host_status: self.host_status,
                driver_status: self.driver_status,
            });
        }

        Ok(Completion {
            status: self.status,
            sense,
            residual: self.resid,
        })
    }
}

/// Talks to `/dev/sg*` through the `SG_IO` ioctl.
///
/// The device node is opened for every command and closed again when the
/// command returns, so no descriptor outlives a single transfer.
#[derive(Debug, Clone)]
pub struct SgTransport {
    path: PathBuf,
    timeout: Duration,
}

impl SgTransport {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// SG_IO with a vendor opcode needs O_RDWR unless the caller has
/// CAP_SYS_RAWIO.
fn open_device(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).write(true).open(path)
}

impl ScsiTransport for SgTransport {
    fn submit(
        &mut self,
        cdb: &Cdb,
        direction: DxferDirection,
        data: &mut DataBlock,
    ) -> Result<Completion> {
        let dev = open_device(&self.path).map_err(MuxError::TransportIoctl)?;

        let mut command = *cdb;
        let mut sense = [0u8; SENSE_LEN];
        let mut hdr =
            SgIoHdr::new(direction, &mut command, data, &mut sense, self.timeout);

        debug!(
            sg = %self.path.display(),
            ?direction,
            cdb = %hex::encode(cdb),
            "submitting CDB"
        );

        // SAFETY: `hdr` only points at `command`, `data` and `sense`, which
        // all outlive the call; the kernel copies the header back in place.
        unsafe { sg_io(dev.as_raw_fd(), &mut hdr) }
            .map_err(|errno| MuxError::TransportIoctl(errno.into()))?;

        hdr.completion(&sense)
    }
}
