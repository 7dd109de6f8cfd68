// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Non-blocking I/O on the PTY master.

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use std::os::fd::{AsFd, AsRawFd};

/// Outcome of a single non-blocking transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// This many bytes moved.
    Done(usize),
    /// Nothing to do right now (EAGAIN).
    WouldBlock,
    /// Every slave descriptor is closed.
    Closed,
}

pub fn set_non_blocking<F: AsRawFd>(fd: &F) -> nix::Result<()> {
    let flags = fcntl(fd.as_raw_fd(), FcntlArg::F_GETFL)?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl(fd.as_raw_fd(), FcntlArg::F_SETFL(flags))?;
    Ok(())
}

/// Read once. Linux reports a hung-up slave as EIO rather than EOF.
pub fn read<F: AsRawFd>(fd: &F, buf: &mut [u8]) -> nix::Result<Transfer> {
    match nix::unistd::read(fd.as_raw_fd(), buf) {
        Ok(0) => Ok(Transfer::Closed),
        Ok(n) => Ok(Transfer::Done(n)),
        Err(Errno::EAGAIN) => Ok(Transfer::WouldBlock),
        Err(Errno::EIO) => Ok(Transfer::Closed),
        Err(e) => Err(e),
    }
}

/// Write once. EIO and EPIPE mean the child side is gone.
pub fn write<F: AsFd>(fd: &F, buf: &[u8]) -> nix::Result<Transfer> {
    match nix::unistd::write(fd, buf) {
        Ok(n) => Ok(Transfer::Done(n)),
        Err(Errno::EAGAIN) => Ok(Transfer::WouldBlock),
        Err(Errno::EIO | Errno::EPIPE) => Ok(Transfer::Closed),
        Err(e) => Err(e),
    }
}
