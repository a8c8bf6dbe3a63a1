//! Bitmap presentation loop: a window class, a message pump, and a
//! `StretchDIBits` blit of a static framebuffer.

use std::ffi::c_void;
use std::mem::size_of;

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use once_cell::sync::OnceCell;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, EndPaint, GetDC, StretchDIBits, BITMAPINFO, BITMAPINFOHEADER, BI_RGB,
    DIB_RGB_COLORS, HDC, PAINTSTRUCT, SRCCOPY,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, PeekMessageW,
    PostQuitMessage, RegisterClassW, TranslateMessage, CS_HREDRAW, CS_OWNDC, CS_VREDRAW,
    CW_USEDEFAULT, MSG, PM_REMOVE, WINDOW_EX_STYLE, WM_CLOSE, WM_DESTROY, WM_PAINT, WM_QUIT,
    WNDCLASSW, WS_OVERLAPPEDWINDOW, WS_VISIBLE,
};

use crate::framebuffer::Framebuffer;

const CLASS_NAME: &str = "softblit-window-class";

/// The scene the window shows. The message pump and the paint handler both
/// read it; it is written exactly once, before the window exists.
static SCENE: OnceCell<Framebuffer> = OnceCell::new();

fn to_wstring<S: AsRef<str>>(s: S) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;

    std::ffi::OsStr::new(s.as_ref())
        .encode_wide()
        .chain(Some(0))
        .collect()
}

fn bitmap_info(fb: &Framebuffer) -> BITMAPINFO {
    let mut bmi = BITMAPINFO::default();
    bmi.bmiHeader.biSize = size_of::<BITMAPINFOHEADER>() as u32;
    bmi.bmiHeader.biWidth = fb.width() as i32;
    // Negative height: top-down rows, matching the framebuffer layout.
    bmi.bmiHeader.biHeight = -(fb.height() as i32);
    bmi.bmiHeader.biPlanes = 1;
    bmi.bmiHeader.biBitCount = 32;
    bmi.bmiHeader.biCompression = BI_RGB;
    bmi
}

fn blit(hdc: HDC, fb: &Framebuffer) {
    let bmi = bitmap_info(fb);
    unsafe {
        StretchDIBits(
            hdc,
            0,
            0,
            fb.width() as i32,
            fb.height() as i32,
            0,
            0,
            fb.width() as i32,
            fb.height() as i32,
            Some(fb.pixels().as_ptr() as *const c_void),
            &bmi,
            DIB_RGB_COLORS,
            SRCCOPY,
        );
    }
}

extern "system" fn window_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    match msg {
        WM_CLOSE => {
            let _ = unsafe { DestroyWindow(hwnd) };
            LRESULT(0)
        }
        WM_DESTROY => {
            unsafe { PostQuitMessage(0) };
            LRESULT(0)
        }
        WM_PAINT => {
            let mut ps = PAINTSTRUCT::default();
            let hdc = unsafe { BeginPaint(hwnd, &mut ps) };
            if let Some(fb) = SCENE.get() {
                blit(hdc, fb);
            }
            unsafe { EndPaint(hwnd, &ps) };
            debug!("painted on WM_PAINT");
            LRESULT(0)
        }
        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}

/// Registers the window class, creates the window, and pumps messages:
/// drain everything pending, then blit the scene. WM_PAINT blits again on
/// demand; both paths stay. Returns once the window is closed.
pub fn run(title: &str, scene: Framebuffer) -> Result<()> {
    let width = scene.width() as i32;
    let height = scene.height() as i32;
    SCENE
        .set(scene)
        .map_err(|_| anyhow!("window already running"))?;

    unsafe {
        let hinstance = GetModuleHandleW(None).context("GetModuleHandleW failed")?;

        let class_name = to_wstring(CLASS_NAME);
        let wc = WNDCLASSW {
            style: CS_HREDRAW | CS_VREDRAW | CS_OWNDC,
            lpfnWndProc: Some(window_proc),
            hInstance: hinstance.into(),
            lpszClassName: PCWSTR(class_name.as_ptr()),
            ..Default::default()
        };
        if RegisterClassW(&wc) == 0 {
            return Err(anyhow::Error::from(windows::core::Error::from_win32())
                .context("failed to register window class"));
        }

        let title_w = to_wstring(title);
        let hwnd = CreateWindowExW(
            WINDOW_EX_STYLE(0),
            PCWSTR(class_name.as_ptr()),
            PCWSTR(title_w.as_ptr()),
            WS_OVERLAPPEDWINDOW | WS_VISIBLE,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            width,
            height,
            None,
            None,
            hinstance,
            None,
        );
        if hwnd.0 == 0 {
            return Err(anyhow::Error::from(windows::core::Error::from_win32())
                .context("failed to create window"));
        }
        info!("created {width}x{height} window");

        let hdc = GetDC(hwnd);
        let fb = SCENE.get().ok_or_else(|| anyhow!("scene missing"))?;

        let mut msg = MSG::default();
        loop {
            while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                if msg.message == WM_QUIT {
                    info!("window closed");
                    return Ok(());
                }
                TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
            blit(hdc, fb);
        }
    }
}
