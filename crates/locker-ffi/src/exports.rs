// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JNI exports for `com.cystack.locker.autofill.NativeAutofill`.
//
// Every entry point takes and returns JSON strings. Java `null` stands for
// an absent optional argument. A call made before `nativeInit` gets the
// same reply as a fault: `noOp` for fill and save, `cancelled` for resume.
// A panic must not unwind across `extern "system"`; every body runs under
// `guarded` and a panic yields the same fault reply.

#![cfg(target_os = "android")]

use jni::JNIEnv;
use jni::objects::{JClass, JObject, JString};
use jni::sys::{JNI_FALSE, JNI_TRUE, jboolean, jstring};
use locker_core::config::AutofillConfig;
use locker_core::error::{LockerError, Result};
use tracing::{info, warn};

use crate::lifecycle::{InitLatch, guarded};
use crate::logging::init_logging;
use crate::service::{self, AutofillService, FALLBACK_CANCELLED, FALLBACK_NO_OP};

/// Closed once the Android context has been handed to `ndk_context`. A
/// failed attempt leaves it open so the next `nativeInit` retries.
static CONTEXT: InitLatch = InitLatch::new();

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn bridge_err(context: &str, e: jni::errors::Error) -> LockerError {
    LockerError::Bridge(format!("{context}: {e}"))
}

/// Register the JavaVM and the application context with `ndk_context` so
/// the platform bridge can reach them from any thread.
fn register_context(env: &mut JNIEnv<'_>, context: &JObject<'_>) -> Result<()> {
    CONTEXT.run(|| {
        let vm = env.get_java_vm().map_err(|e| bridge_err("GetJavaVM", e))?;
        let app_context = env
            .call_method(context, "getApplicationContext", "()Landroid/content/Context;", &[])
            .map_err(|e| bridge_err("getApplicationContext", e))?
            .l()
            .map_err(|e| bridge_err("getApplicationContext->l", e))?;
        let global = env
            .new_global_ref(app_context)
            .map_err(|e| bridge_err("NewGlobalRef(context)", e))?;
        // SAFETY: both pointers are valid for the life of the process; the
        // global reference is never released. The latch runs this at most
        // once successfully.
        unsafe {
            ndk_context::initialize_android_context(
                vm.get_java_vm_pointer().cast(),
                global.as_obj().as_raw().cast(),
            );
        }
        std::mem::forget(global);
        Ok(())
    })
}

fn read_string(env: &mut JNIEnv<'_>, value: &JString<'_>) -> Option<String> {
    if value.is_null() {
        return None;
    }
    match env.get_string(value) {
        Ok(s) => Some(s.into()),
        Err(e) => {
            warn!(error = %e, "JNI string argument unreadable");
            None
        }
    }
}

fn to_jstring(env: &mut JNIEnv<'_>, value: &str) -> jstring {
    match env.new_string(value) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            warn!(error = %e, "JNI reply string could not be created");
            std::ptr::null_mut()
        }
    }
}

fn to_jboolean(value: bool) -> jboolean {
    if value { JNI_TRUE } else { JNI_FALSE }
}

fn with_service<T>(fallback: T, f: impl FnOnce(&AutofillService) -> T) -> T {
    match service::service() {
        Ok(svc) => f(svc),
        Err(e) => {
            warn!(error = %e, "native call before nativeInit");
            fallback
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// `static native boolean nativeInit(Context context, String configJson)`
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_cystack_locker_autofill_NativeAutofill_nativeInit<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    context: JObject<'local>,
    config_json: JString<'local>,
) -> jboolean {
    let ready = guarded("nativeInit", || false, || {
        init_logging();
        if let Err(e) = register_context(&mut env, &context) {
            warn!(error = %e, "Android context registration failed");
            return false;
        }

        let config = match read_string(&mut env, &config_json) {
            Some(json) => AutofillConfig::from_json(&json).unwrap_or_else(|e| {
                warn!(error = %e, "invalid autofill config, using defaults");
                AutofillConfig::default()
            }),
            None => AutofillConfig::default(),
        };
        service::init_service(config);
        info!("native autofill ready");
        true
    });
    to_jboolean(ready)
}

// ---------------------------------------------------------------------------
// Fill / save / resume
// ---------------------------------------------------------------------------

/// `static native String nativeOnFillRequest(String requestJson)`
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_cystack_locker_autofill_NativeAutofill_nativeOnFillRequest<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    request_json: JString<'local>,
) -> jstring {
    let reply = guarded("nativeOnFillRequest", || FALLBACK_NO_OP.to_owned(), || {
        let request = read_string(&mut env, &request_json).unwrap_or_default();
        with_service(FALLBACK_NO_OP.to_owned(), |svc| svc.fill_json(&request))
    });
    to_jstring(&mut env, &reply)
}

/// `static native String nativeOnSaveRequest(String requestJson)`
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_cystack_locker_autofill_NativeAutofill_nativeOnSaveRequest<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    request_json: JString<'local>,
) -> jstring {
    let reply = guarded("nativeOnSaveRequest", || FALLBACK_NO_OP.to_owned(), || {
        let request = read_string(&mut env, &request_json).unwrap_or_default();
        with_service(FALLBACK_NO_OP.to_owned(), |svc| svc.save_json(&request))
    });
    to_jstring(&mut env, &reply)
}

/// `static native String nativeCompleteAuthentication(String handle,
/// String chosenJson, String inlineJson)`. `chosenJson` is null when the
/// user dismissed the unlock screen.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_cystack_locker_autofill_NativeAutofill_nativeCompleteAuthentication<
    'local,
>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: JString<'local>,
    chosen_json: JString<'local>,
    inline_json: JString<'local>,
) -> jstring {
    let reply = guarded("nativeCompleteAuthentication", || FALLBACK_CANCELLED.to_owned(), || {
        let handle = read_string(&mut env, &handle).unwrap_or_default();
        let chosen = read_string(&mut env, &chosen_json);
        let inline = read_string(&mut env, &inline_json);
        with_service(FALLBACK_CANCELLED.to_owned(), |svc| {
            svc.complete_authentication_json(&handle, chosen.as_deref(), inline.as_deref())
        })
    });
    to_jstring(&mut env, &reply)
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// `static native boolean nativeForgetLastUsed(String siteJson)`
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_cystack_locker_autofill_NativeAutofill_nativeForgetLastUsed<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    site_json: JString<'local>,
) -> jboolean {
    let forgotten = guarded("nativeForgetLastUsed", || false, || {
        let site = read_string(&mut env, &site_json).unwrap_or_default();
        with_service(false, |svc| match svc.forget_last_used(&site) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "forget last-used failed");
                false
            }
        })
    });
    to_jboolean(forgotten)
}

/// `static native boolean nativeClearLastUsed()`, called on sign-out.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_cystack_locker_autofill_NativeAutofill_nativeClearLastUsed<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jboolean {
    let cleared = guarded("nativeClearLastUsed", || false, || {
        with_service(false, |svc| match svc.clear_last_used() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "clear last-used failed");
                false
            }
        })
    });
    to_jboolean(cleared)
}

/// `static native boolean nativeVerifyMasterPassword(String masterPassword)`
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_cystack_locker_autofill_NativeAutofill_nativeVerifyMasterPassword<
    'local,
>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    master_password: JString<'local>,
) -> jboolean {
    let verified = guarded("nativeVerifyMasterPassword", || false, || {
        let Some(master) = read_string(&mut env, &master_password) else {
            return false;
        };
        with_service(false, |svc| {
            svc.verify_master_password(&master).unwrap_or_else(|e| {
                warn!(error = %e, "master password could not be checked");
                false
            })
        })
    });
    to_jboolean(verified)
}
