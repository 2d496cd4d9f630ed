use anyhow::{anyhow, Result};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Read timeout for the blocking receive loop; short so cancellation is
/// noticed quickly
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Socket with metadata about type (for DGRAM-aware reply parsing)
#[derive(Debug)]
pub struct SocketInfo {
    pub socket: Socket,
    /// True if SOCK_DGRAM (no IP header in received packets, kernel
    /// rewrites the echo identifier)
    pub is_dgram: bool,
}

/// Whether this platform has no unprivileged ICMP socket type
pub fn platform_requires_raw() -> bool {
    cfg!(windows)
}

/// Create the socket used for both sending echo requests and receiving
/// replies.
///
/// With `privileged` set, only a RAW socket is attempted. Otherwise a
/// DGRAM ICMP socket is preferred (works unprivileged on Linux with
/// ping_group_range, and by default on macOS), falling back to RAW.
///
/// A single socket serves both directions: the kernel delivers DGRAM
/// echo replies only to the socket that sent the matching request.
pub fn create_icmp_socket(ipv6: bool, privileged: bool) -> Result<SocketInfo> {
    if privileged {
        let socket = create_raw_icmp_socket(ipv6).map_err(|e| permission_error(e, true))?;
        return Ok(SocketInfo {
            socket,
            is_dgram: false,
        });
    }

    if let Ok(socket) = create_dgram_icmp_socket(ipv6) {
        return Ok(SocketInfo {
            socket,
            is_dgram: true,
        });
    }

    let socket = create_raw_icmp_socket(ipv6).map_err(|e| permission_error(e, false))?;
    Ok(SocketInfo {
        socket,
        is_dgram: false,
    })
}

fn permission_error(source: anyhow::Error, privileged: bool) -> anyhow::Error {
    let binary_path = std::env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "artping".to_string());

    let mode = if privileged {
        "Raw ICMP sockets require elevated privileges."
    } else {
        "Neither DGRAM nor RAW ICMP sockets could be created."
    };

    anyhow!(
        "{mode}\n\n\
         Fix options:\n\
         \u{2022} Run with sudo: sudo artping <host>\n\
         \u{2022} Add capability: sudo setcap cap_net_raw+ep {binary_path}\n\
         \u{2022} Enable unprivileged ICMP: sudo sysctl -w net.ipv4.ping_group_range='0 65534'\n\n\
         Underlying error: {source:#}"
    )
}

fn create_raw_icmp_socket(ipv6: bool) -> Result<Socket> {
    let domain = if ipv6 { Domain::IPV6 } else { Domain::IPV4 };
    let protocol = if ipv6 {
        Protocol::ICMPV6
    } else {
        Protocol::ICMPV4
    };

    let socket = Socket::new(domain, Type::RAW, Some(protocol))?;
    socket.set_nonblocking(false)?;
    socket.set_read_timeout(Some(READ_TIMEOUT))?;
    Ok(socket)
}

fn create_dgram_icmp_socket(ipv6: bool) -> Result<Socket> {
    let domain = if ipv6 { Domain::IPV6 } else { Domain::IPV4 };
    let protocol = if ipv6 {
        Protocol::ICMPV6
    } else {
        Protocol::ICMPV4
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(protocol))?;
    socket.set_nonblocking(false)?;
    socket.set_read_timeout(Some(READ_TIMEOUT))?;
    Ok(socket)
}

/// Send an echo request packet to the target
pub fn send_echo(socket: &Socket, packet: &[u8], target: IpAddr) -> Result<usize> {
    let addr = SocketAddr::new(target, 0);
    let sock_addr = SockAddr::from(addr);
    let sent = socket.send_to(packet, &sock_addr)?;
    Ok(sent)
}

/// Result of receiving an ICMP packet along with its IP-header TTL
#[derive(Debug)]
pub struct RecvResult {
    pub len: usize,
    pub source: IpAddr,
    /// TTL/hop-limit from the IP header of the response packet, when the
    /// kernel delivered it via ancillary data
    pub response_ttl: Option<u8>,
}

/// Enable IP_RECVTTL/IPV6_RECVHOPLIMIT so recvmsg() reports the TTL of
/// received packets in ancillary data.
///
/// Needed on DGRAM sockets, where the IP header is stripped before
/// delivery and the TTL field is otherwise lost.
#[cfg(unix)]
pub fn enable_recv_ttl(socket: &Socket, ipv6: bool) -> Result<()> {
    use std::os::unix::io::AsRawFd;

    #[cfg(target_os = "linux")]
    const IP_RECVTTL: libc::c_int = 12;
    #[cfg(target_os = "linux")]
    const IPV6_RECVHOPLIMIT: libc::c_int = 51;
    #[cfg(target_os = "macos")]
    const IP_RECVTTL: libc::c_int = 24;
    #[cfg(target_os = "macos")]
    const IPV6_RECVHOPLIMIT: libc::c_int = 37;

    let (level, optname) = if ipv6 {
        (libc::IPPROTO_IPV6, IPV6_RECVHOPLIMIT)
    } else {
        (libc::IPPROTO_IP, IP_RECVTTL)
    };

    let val: libc::c_int = 1;
    let ret = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            level,
            optname,
            &val as *const _ as *const libc::c_void,
            std::mem::size_of_val(&val) as libc::socklen_t,
        )
    };
    if ret != 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(())
}

/// Receive one ICMP packet with its response TTL.
///
/// Uses recvmsg() so the TTL/hop-limit control message can be read
/// alongside the packet data.
#[cfg(unix)]
pub fn recv_reply(socket: &Socket, buffer: &mut [u8], ipv6: bool) -> Result<RecvResult> {
    use std::os::unix::io::AsRawFd;

    let mut iov = libc::iovec {
        iov_base: buffer.as_mut_ptr() as *mut libc::c_void,
        iov_len: buffer.len(),
    };

    let mut cmsg_buf = [0u8; 64];
    let mut src_storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };

    let mut msg: libc::msghdr = unsafe { std::mem::zeroed() };
    msg.msg_name = &mut src_storage as *mut _ as *mut libc::c_void;
    msg.msg_namelen = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
    msg.msg_iov = &mut iov;
    msg.msg_iovlen = 1;
    msg.msg_control = cmsg_buf.as_mut_ptr() as *mut libc::c_void;
    // msg_controllen type differs: usize on Linux, u32 on macOS
    msg.msg_controllen = cmsg_buf.len() as _;

    let len = unsafe { libc::recvmsg(socket.as_raw_fd(), &mut msg, 0) };
    if len < 0 {
        return Err(std::io::Error::last_os_error().into());
    }

    let source = parse_sockaddr_storage(&src_storage)?;
    let response_ttl = extract_ttl_from_cmsg(&msg, ipv6);

    Ok(RecvResult {
        len: len as usize,
        source,
        response_ttl,
    })
}

#[cfg(unix)]
fn extract_ttl_from_cmsg(msg: &libc::msghdr, ipv6: bool) -> Option<u8> {
    // Linux reports IP_TTL = 2; macOS may deliver IP_TTL (4) or
    // IP_RECVTTL (24)
    #[cfg(target_os = "linux")]
    fn is_ip_ttl_type(cmsg_type: libc::c_int) -> bool {
        cmsg_type == 2
    }
    #[cfg(target_os = "macos")]
    fn is_ip_ttl_type(cmsg_type: libc::c_int) -> bool {
        cmsg_type == 4 || cmsg_type == 24
    }

    unsafe {
        let mut cmsg = libc::CMSG_FIRSTHDR(msg);
        while !cmsg.is_null() {
            let hdr = &*cmsg;

            if ipv6 {
                if hdr.cmsg_level == libc::IPPROTO_IPV6 && hdr.cmsg_type == libc::IPV6_HOPLIMIT {
                    let data_ptr = libc::CMSG_DATA(cmsg);
                    let ttl = *(data_ptr as *const i32);
                    return Some(ttl as u8);
                }
            } else if hdr.cmsg_level == libc::IPPROTO_IP && is_ip_ttl_type(hdr.cmsg_type) {
                let data_ptr = libc::CMSG_DATA(cmsg);
                let ttl = *(data_ptr as *const i32);
                return Some(ttl as u8);
            }

            cmsg = libc::CMSG_NXTHDR(msg, cmsg);
        }
    }
    None
}

#[cfg(unix)]
fn parse_sockaddr_storage(storage: &libc::sockaddr_storage) -> Result<IpAddr> {
    match storage.ss_family as libc::c_int {
        libc::AF_INET => {
            let addr: &libc::sockaddr_in = unsafe { &*(storage as *const _ as *const _) };
            let ip = std::net::Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr));
            Ok(IpAddr::V4(ip))
        }
        libc::AF_INET6 => {
            let addr: &libc::sockaddr_in6 = unsafe { &*(storage as *const _ as *const _) };
            let ip = std::net::Ipv6Addr::from(addr.sin6_addr.s6_addr);
            Ok(IpAddr::V6(ip))
        }
        _ => Err(anyhow!("Unknown address family: {}", storage.ss_family)),
    }
}

/// Fallback receive path for platforms without recvmsg support
#[cfg(not(unix))]
pub fn recv_reply(socket: &Socket, buffer: &mut [u8], _ipv6: bool) -> Result<RecvResult> {
    use std::mem::MaybeUninit;

    // socket2 requires MaybeUninit for recv_from
    let uninit =
        unsafe { &mut *(buffer as *mut [u8] as *mut [MaybeUninit<u8>]) };
    let (len, addr) = socket.recv_from(uninit)?;
    let source = addr
        .as_socket()
        .map(|s| s.ip())
        .ok_or_else(|| anyhow!("received packet with unknown address family"))?;

    Ok(RecvResult {
        len,
        source,
        response_ttl: None,
    })
}

#[cfg(not(unix))]
pub fn enable_recv_ttl(_socket: &Socket, _ipv6: bool) -> Result<()> {
    Ok(())
}
