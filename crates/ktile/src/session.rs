use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::sync::Mutex;

static CHILDREN: Mutex<Vec<i32>> = Mutex::new(Vec::new());

pub fn register_child(pid: i32) {
    if let Ok(mut children) = CHILDREN.lock() {
        children.push(pid);
    }
}

pub fn forget_child(pid: i32) {
    if let Ok(mut children) = CHILDREN.lock() {
        children.retain(|&p| p != pid);
    }
}

/// SIGTERM, a short grace period, then SIGKILL for anything still around.
pub fn terminate_children() {
    let pids: Vec<i32> = match CHILDREN.lock() {
        Ok(children) => children.clone(),
        Err(_) => return,
    };
    if pids.is_empty() {
        return;
    }
    log::info!("[session] Terminating {} child process(es)", pids.len());

    for &pid in &pids {
        unsafe {
            libc::kill(pid, libc::SIGTERM);
        }
    }

    std::thread::sleep(std::time::Duration::from_millis(100));

    for &pid in &pids {
        unsafe {
            libc::kill(pid, libc::SIGKILL);
        }
    }
}

/// The controlling virtual terminal. Holding one is what makes VT switching
/// possible; without it the compositor runs fine but `C-M-F<n>` is ignored.
pub struct Session {
    tty: OwnedFd,
    old_kb_mode: i32,
    vt_num: i32,
}

impl Session {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let tty = open_tty()?;
        let fd = tty.as_raw_fd();
        let vt_num = get_vt_num(fd)?;

        log::info!("[session] Session starting on VT{}", vt_num);

        let old_kb_mode = get_kb_mode(fd)?;
        set_kb_mode(fd, K_OFF)?;

        Ok(Session {
            tty,
            old_kb_mode,
            vt_num,
        })
    }

    pub fn vt_num(&self) -> i32 {
        self.vt_num
    }

    pub fn activate(&self, vt: i32) -> bool {
        if vt < 1 {
            return false;
        }
        let ret = unsafe { libc::ioctl(self.tty.as_raw_fd(), VT_ACTIVATE, vt) };
        if ret < 0 {
            log::warn!(
                "[session] VT_ACTIVATE {} failed: {}",
                vt,
                std::io::Error::last_os_error()
            );
            return false;
        }
        log::info!("[session] Switched to VT{}", vt);
        true
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let fd = self.tty.as_raw_fd();
        if let Err(e) = set_kb_mode(fd, self.old_kb_mode) {
            log::error!("[session] Failed to restore keyboard mode: {}", e);
        }
        unsafe {
            libc::ioctl(fd, VT_ACTIVATE, self.vt_num);
        }
        log::info!("[session] TTY restored");
    }
}

fn open_tty() -> Result<OwnedFd, Box<dyn std::error::Error>> {
    let tty_path = std::fs::read_to_string("/sys/class/tty/tty0/active")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|name| !name.is_empty())
        .map(|name| format!("/dev/{}", name))
        .unwrap_or_else(|| "/dev/tty".to_string());

    log::debug!("[session] Opening TTY: {}", tty_path);

    let path = std::ffi::CString::new(tty_path.clone())?;
    let fd = unsafe { libc::open(path.as_ptr(), libc::O_RDWR | libc::O_CLOEXEC) };
    if fd < 0 {
        return Err(format!(
            "Failed to open TTY {}: {}",
            tty_path,
            std::io::Error::last_os_error()
        )
        .into());
    }

    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn get_vt_num(fd: RawFd) -> Result<i32, Box<dyn std::error::Error>> {
    #[repr(C)]
    struct VtStat {
        v_active: u16,
        v_signal: u16,
        v_state: u16,
    }

    let mut stat: VtStat = unsafe { std::mem::zeroed() };

    if unsafe { libc::ioctl(fd, VT_GETSTATE, &mut stat) } < 0 {
        return Err("Failed to get VT state".into());
    }

    Ok(stat.v_active as i32)
}

fn get_kb_mode(fd: RawFd) -> Result<i32, Box<dyn std::error::Error>> {
    let mut mode: i32 = 0;

    if unsafe { libc::ioctl(fd, KDGKBMODE, &mut mode) } < 0 {
        return Err("Failed to get keyboard mode".into());
    }

    Ok(mode)
}

fn set_kb_mode(fd: RawFd, mode: i32) -> Result<(), Box<dyn std::error::Error>> {
    if unsafe { libc::ioctl(fd, KDSKBMODE, mode) } < 0 {
        return Err(format!(
            "Failed to set keyboard mode to {}: {}",
            mode,
            std::io::Error::last_os_error()
        )
        .into());
    }

    Ok(())
}

const KDGKBMODE: libc::c_ulong = 0x4B44;
const KDSKBMODE: libc::c_ulong = 0x4B45;

const K_OFF: i32 = 0x04;

const VT_GETSTATE: libc::c_ulong = 0x5603;
const VT_ACTIVATE: libc::c_ulong = 0x5606;
