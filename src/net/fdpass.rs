//! Descriptor passing over Unix sockets (SCM_RIGHTS).

use std::io;
use std::mem::{size_of, size_of_val};
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

use tokio::io::Interest;
use tokio::net::UnixStream;

// Room for one SCM_RIGHTS message with a few descriptors, aligned for cmsghdr.
type ControlBuf = [u64; 8];

fn sendmsg_with_fds(sock: RawFd, bytes: &[u8], fds: &[RawFd]) -> io::Result<usize> {
    let mut control: ControlBuf = [0; 8];
    let mut iov = libc::iovec {
        iov_base: bytes.as_ptr() as *mut libc::c_void,
        iov_len: bytes.len(),
    };

    let data_len = size_of_val(fds);
    // SAFETY: CMSG_SPACE is a pure size computation.
    let space = unsafe { libc::CMSG_SPACE(data_len as u32) } as usize;
    if space > size_of::<ControlBuf>() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} descriptors do not fit one control message", fds.len()),
        ));
    }

    // SAFETY: msghdr is plain data; every pointer placed in it outlives the
    // sendmsg call, and the control buffer holds CMSG_SPACE(data_len).
    unsafe {
        let mut msg: libc::msghdr = std::mem::zeroed();
        msg.msg_iov = &mut iov;
        msg.msg_iovlen = 1;
        msg.msg_control = control.as_mut_ptr().cast();
        msg.msg_controllen = space as _;

        let cmsg = libc::CMSG_FIRSTHDR(&msg);
        (*cmsg).cmsg_level = libc::SOL_SOCKET;
        (*cmsg).cmsg_type = libc::SCM_RIGHTS;
        (*cmsg).cmsg_len = libc::CMSG_LEN(data_len as u32) as _;
        std::ptr::copy_nonoverlapping(fds.as_ptr().cast::<u8>(), libc::CMSG_DATA(cmsg), data_len);

        let n = libc::sendmsg(sock, &msg, 0);
        if n < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(n as usize)
        }
    }
}

fn recvmsg_with_fd(sock: RawFd, buf: &mut [u8]) -> io::Result<(usize, Option<OwnedFd>)> {
    let mut control: ControlBuf = [0; 8];
    let mut iov = libc::iovec {
        iov_base: buf.as_mut_ptr().cast(),
        iov_len: buf.len(),
    };

    // SAFETY: as above; received descriptors are taken into OwnedFd exactly once.
    unsafe {
        let mut msg: libc::msghdr = std::mem::zeroed();
        msg.msg_iov = &mut iov;
        msg.msg_iovlen = 1;
        msg.msg_control = control.as_mut_ptr().cast();
        msg.msg_controllen = size_of::<ControlBuf>() as _;

        let n = libc::recvmsg(sock, &mut msg, libc::MSG_CMSG_CLOEXEC);
        if n < 0 {
            return Err(io::Error::last_os_error());
        }

        if msg.msg_flags & libc::MSG_CTRUNC != 0 {
            tracing::warn!("control data truncated, some passed descriptors were discarded");
        }

        // Every received descriptor is owned here, so extras are closed on drop.
        let mut received = Vec::new();
        let mut cmsg = libc::CMSG_FIRSTHDR(&msg);
        while !cmsg.is_null() {
            if (*cmsg).cmsg_level == libc::SOL_SOCKET && (*cmsg).cmsg_type == libc::SCM_RIGHTS {
                let header_len = libc::CMSG_LEN(0) as usize;
                let data_len = ((*cmsg).cmsg_len as usize).saturating_sub(header_len);
                let data = libc::CMSG_DATA(cmsg);
                for i in 0..data_len / size_of::<libc::c_int>() {
                    let mut raw = [0u8; size_of::<libc::c_int>()];
                    std::ptr::copy_nonoverlapping(
                        data.add(i * size_of::<libc::c_int>()),
                        raw.as_mut_ptr(),
                        raw.len(),
                    );
                    received.push(OwnedFd::from_raw_fd(libc::c_int::from_ne_bytes(raw)));
                }
            }
            cmsg = libc::CMSG_NXTHDR(&msg, cmsg);
        }

        if received.len() > 1 {
            tracing::warn!(count = received.len(), "more than one descriptor passed, keeping the first");
        }
        Ok((n as usize, received.into_iter().next()))
    }
}

/// Writes `bytes` with `fd` attached as ancillary data.
pub async fn send_with_fd(stream: &UnixStream, bytes: &[u8], fd: BorrowedFd<'_>) -> io::Result<usize> {
    let sock = stream.as_raw_fd();
    let raw = fd.as_raw_fd();
    loop {
        stream.writable().await?;
        match stream.try_io(Interest::WRITABLE, || sendmsg_with_fds(sock, bytes, &[raw])) {
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            result => return result,
        }
    }
}

/// Reads into `buf`, returning any descriptor that came with the data.
pub async fn recv_with_fd(stream: &UnixStream, buf: &mut [u8]) -> io::Result<(usize, Option<OwnedFd>)> {
    let sock = stream.as_raw_fd();
    loop {
        stream.readable().await?;
        match stream.try_io(Interest::READABLE, || recvmsg_with_fd(sock, buf)) {
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, Write};
    use std::os::fd::AsFd;

    #[tokio::test]
    async fn passes_open_file() {
        let (a, b) = UnixStream::pair().unwrap();
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"shared").unwrap();
        file.rewind().unwrap();

        let sent = send_with_fd(&a, b"hdr!", file.as_fd()).await.unwrap();
        assert_eq!(sent, 4);

        let mut buf = [0u8; 16];
        let (n, fd) = recv_with_fd(&b, &mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hdr!");

        let mut received = std::fs::File::from(fd.unwrap());
        let mut content = String::new();
        received.read_to_string(&mut content).unwrap();
        assert_eq!(content, "shared");
    }

    fn file_with(body: &[u8]) -> std::fs::File {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(body).unwrap();
        file.rewind().unwrap();
        file
    }

    #[tokio::test]
    async fn several_descriptors_in_one_message_keep_the_first() {
        let (a, b) = UnixStream::pair().unwrap();
        let first = file_with(b"first");
        let second = file_with(b"second");

        a.writable().await.unwrap();
        let sent = sendmsg_with_fds(a.as_raw_fd(), b"hdr!", &[first.as_raw_fd(), second.as_raw_fd()]).unwrap();
        assert_eq!(sent, 4);

        let mut buf = [0u8; 16];
        let (n, fd) = recv_with_fd(&b, &mut buf).await.unwrap();
        assert_eq!(n, 4);

        let mut received = std::fs::File::from(fd.unwrap());
        let mut content = String::new();
        received.read_to_string(&mut content).unwrap();
        assert_eq!(content, "first");
    }

    #[test]
    fn too_many_descriptors_rejected() {
        let fds = [0 as RawFd; 64];
        let err = sendmsg_with_fds(-1, b"x", &fds).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
