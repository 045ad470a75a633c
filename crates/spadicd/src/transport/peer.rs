//! Peer naming for connection logs.

use std::net::SocketAddr;

/// Resolves the host name of `addr`, falling back to its IP address.
pub(crate) fn resolve_peer_name(addr: &SocketAddr) -> String {
    reverse_lookup(addr).unwrap_or_else(|| addr.ip().to_string())
}

#[cfg(unix)]
fn reverse_lookup(addr: &SocketAddr) -> Option<String> {
    use std::ffi::CStr;
    use std::os::raw::c_char;

    use socket2::SockAddr;

    const HOST_LEN: usize = 1025;

    let sock = SockAddr::from(*addr);
    let mut host: [c_char; HOST_LEN] = [0; HOST_LEN];
    // SAFETY: `sock` outlives the call and reports its own length; `host` is
    // a writable buffer of the advertised size and no service buffer is used.
    let status = unsafe {
        libc::getnameinfo(
            sock.as_ptr().cast(),
            sock.len(),
            host.as_mut_ptr(),
            HOST_LEN as libc::socklen_t,
            std::ptr::null_mut(),
            0,
            libc::NI_NAMEREQD,
        )
    };
    if status != 0 {
        return None;
    }
    // SAFETY: getnameinfo NUL-terminates `host` on success.
    let name = unsafe { CStr::from_ptr(host.as_ptr()) };
    name.to_str().ok().map(str::to_owned)
}

#[cfg(not(unix))]
fn reverse_lookup(_addr: &SocketAddr) -> Option<String> {
    None
}
