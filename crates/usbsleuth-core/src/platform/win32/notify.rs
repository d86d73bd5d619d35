/// Volume arrival/removal notifications via `WM_DEVICECHANGE`.
///
/// Windows broadcasts `DBT_DEVICEARRIVAL` / `DBT_DEVICEREMOVECOMPLETE` with a
/// `DEV_BROADCAST_VOLUME` payload to every top-level window. The subscription
/// registers a private window class and creates a hidden top-level window on
/// the calling thread; the watcher then pumps that thread's message queue with
/// `MsgWaitForMultipleObjects`, which gives a bounded wait.
///
/// Window handles belong to the thread that created them, so the subscription
/// must be created, waited on and dropped on one thread. `HWND` is `!Send`,
/// which makes the compiler enforce that.
///
/// # Cancellation
///
/// [`ThreadInterrupter`] posts `WM_QUIT` to the owning thread, which wakes a
/// blocked wait immediately. Without it the wait still returns at its timeout.
use crate::error::{EnumerationError, SubscriptionError};
use crate::platform::{
    DriveType, RawVolumeEvent, VolumeNotifier, VolumeSubscription, WaitInterrupter, WaitOutcome,
    VOLUME_EVENT_ARRIVAL, VOLUME_EVENT_REMOVAL,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

use windows::core::PCWSTR;
use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, MsgWaitForMultipleObjects,
    PeekMessageW, PostThreadMessageW, RegisterClassW, TranslateMessage, UnregisterClassW, HMENU,
    MSG, PM_REMOVE, QS_ALLINPUT, WINDOW_EX_STYLE, WINDOW_STYLE, WM_DEVICECHANGE, WM_QUIT,
    WNDCLASSW,
};

// Values from dbt.h.
const DBT_DEVICEARRIVAL: usize = 0x8000;
const DBT_DEVICEREMOVECOMPLETE: usize = 0x8004;
const DBT_DEVTYP_VOLUME: u32 = 0x0000_0002;

// MsgWaitForMultipleObjects results with no handles.
const WAIT_OBJECT_0_VAL: u32 = 0x0000_0000;
const WAIT_TIMEOUT_VAL: u32 = 0x0000_0102;

#[repr(C)]
#[allow(dead_code)]
struct DevBroadcastHdr {
    size: u32,
    device_type: u32,
    reserved: u32,
}

#[repr(C)]
#[allow(dead_code)]
struct DevBroadcastVolume {
    size: u32,
    device_type: u32,
    reserved: u32,
    unit_mask: u32,
    flags: u16,
}

thread_local! {
    /// Notifications decoded by the window procedure, waiting to be returned
    /// from `next_event` on this same thread.
    static PENDING: RefCell<VecDeque<RawVolumeEvent>> = const { RefCell::new(VecDeque::new()) };
}

/// Creates [`DeviceChangeSubscription`]s on the calling thread.
pub struct DeviceChangeNotifier;

impl VolumeNotifier for DeviceChangeNotifier {
    fn subscribe(&self) -> Result<Box<dyn VolumeSubscription>, SubscriptionError> {
        Ok(Box::new(DeviceChangeSubscription::open()?))
    }
}

/// A hidden window receiving volume broadcasts for the owning thread.
pub struct DeviceChangeSubscription {
    hwnd: HWND,
    hinstance: HINSTANCE,
    /// Null-terminated UTF-16 class name; must outlive the registration.
    class_name: Vec<u16>,
    thread_id: u32,
}

impl DeviceChangeSubscription {
    fn open() -> Result<Self, SubscriptionError> {
        let thread_id = unsafe { GetCurrentThreadId() };

        let hinstance: HINSTANCE = unsafe { GetModuleHandleW(None) }
            .map_err(|e| SubscriptionError::Connect(format!("GetModuleHandleW failed: {e}")))?
            .into();

        // One class per watcher thread, so a slow teardown of a previous
        // thread cannot collide with a fresh registration.
        let class_name: Vec<u16> = format!("UsbSleuthVolumeWatcher{thread_id}")
            .encode_utf16()
            .chain(std::iter::once(0))
            .collect();

        let class = WNDCLASSW {
            lpfnWndProc: Some(volume_wndproc),
            hInstance: hinstance,
            lpszClassName: PCWSTR(class_name.as_ptr()),
            ..Default::default()
        };
        if unsafe { RegisterClassW(&class) } == 0 {
            let err = windows::core::Error::from_win32();
            return Err(SubscriptionError::Connect(format!(
                "RegisterClassW failed: {err}"
            )));
        }

        // Top-level (not message-only) so it receives broadcasts; never shown.
        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                PCWSTR(class_name.as_ptr()),
                PCWSTR(class_name.as_ptr()),
                WINDOW_STYLE::default(),
                0,
                0,
                0,
                0,
                HWND::default(),
                HMENU::default(),
                hinstance,
                None,
            )
        };
        let hwnd = match hwnd {
            Ok(h) => h,
            Err(e) => {
                unsafe {
                    let _ = UnregisterClassW(PCWSTR(class_name.as_ptr()), hinstance);
                }
                return Err(SubscriptionError::Connect(format!(
                    "CreateWindowExW failed: {e}"
                )));
            }
        };

        PENDING.with(|q| q.borrow_mut().clear());
        debug!("Device-change window created on thread {}", thread_id);

        Ok(Self {
            hwnd,
            hinstance,
            class_name,
            thread_id,
        })
    }

    /// Dispatch everything queued for this thread. Returns `true` if a
    /// `WM_QUIT` (interrupt) was seen.
    fn pump_messages(&self) -> bool {
        let mut quit = false;
        let mut msg = MSG::default();
        while unsafe { PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE) }.as_bool() {
            if msg.message == WM_QUIT {
                quit = true;
                continue;
            }
            unsafe {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
        quit
    }
}

fn pop_pending() -> Option<RawVolumeEvent> {
    PENDING.with(|q| q.borrow_mut().pop_front())
}

impl VolumeSubscription for DeviceChangeSubscription {
    fn next_event(&mut self, timeout: Duration) -> Result<WaitOutcome, SubscriptionError> {
        if let Some(event) = pop_pending() {
            return Ok(WaitOutcome::Event(event));
        }

        let millis = timeout.as_millis().min(u32::MAX as u128) as u32;
        let wait = unsafe { MsgWaitForMultipleObjects(None, false, millis, QS_ALLINPUT) };

        match wait.0 {
            WAIT_OBJECT_0_VAL => {
                let interrupted = self.pump_messages();
                if let Some(event) = pop_pending() {
                    Ok(WaitOutcome::Event(event))
                } else if interrupted {
                    Ok(WaitOutcome::Interrupted)
                } else {
                    // Unrelated input woke us; the caller re-checks and waits again.
                    Ok(WaitOutcome::Timeout)
                }
            }
            WAIT_TIMEOUT_VAL => Ok(WaitOutcome::Timeout),
            other => Err(SubscriptionError::Wait(format!(
                "MsgWaitForMultipleObjects returned {other:#x}"
            ))),
        }
    }

    fn drive_type(&mut self, drive_letter: &str) -> Result<DriveType, EnumerationError> {
        Ok(super::drives::drive_type(drive_letter))
    }

    fn interrupter(&self) -> Option<Box<dyn WaitInterrupter>> {
        Some(Box::new(ThreadInterrupter {
            thread_id: self.thread_id,
        }))
    }
}

impl Drop for DeviceChangeSubscription {
    fn drop(&mut self) {
        unsafe {
            let _ = DestroyWindow(self.hwnd);
            let _ = UnregisterClassW(PCWSTR(self.class_name.as_ptr()), self.hinstance);
        }
        PENDING.with(|q| q.borrow_mut().clear());
        debug!("Device-change window released on thread {}", self.thread_id);
    }
}

/// Wakes the owning thread's wait by posting `WM_QUIT` to it.
pub struct ThreadInterrupter {
    thread_id: u32,
}

impl WaitInterrupter for ThreadInterrupter {
    fn interrupt(&self) {
        // Fails if the thread has already exited; nothing to wake then.
        let _ = unsafe { PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) };
    }
}

unsafe extern "system" fn volume_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_DEVICECHANGE {
        let event_type = match wparam.0 {
            DBT_DEVICEARRIVAL => Some(VOLUME_EVENT_ARRIVAL),
            DBT_DEVICEREMOVECOMPLETE => Some(VOLUME_EVENT_REMOVAL),
            _ => None,
        };
        if let Some(event_type) = event_type {
            if lparam.0 != 0 {
                // SAFETY: for arrival/removal, lparam points at a
                // DEV_BROADCAST_HDR valid for the duration of this call.
                let hdr = &*(lparam.0 as *const DevBroadcastHdr);
                if hdr.device_type == DBT_DEVTYP_VOLUME {
                    let volume = &*(lparam.0 as *const DevBroadcastVolume);
                    queue_volume_events(event_type, volume.unit_mask);
                }
            }
        }
        return LRESULT(1);
    }
    DefWindowProcW(hwnd, msg, wparam, lparam)
}

/// One raw event per drive letter set in `unit_mask` (bit 0 = `A:`).
fn queue_volume_events(event_type: u16, unit_mask: u32) {
    PENDING.with(|q| {
        let mut q = q.borrow_mut();
        for bit in 0..26u8 {
            if unit_mask & (1 << bit) != 0 {
                let letter = char::from(b'A' + bit);
                q.push_back(RawVolumeEvent {
                    event_type,
                    drive_name: Some(format!("{letter}:\\")),
                });
            }
        }
    });
}
