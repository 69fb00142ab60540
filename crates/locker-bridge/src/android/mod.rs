// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android platform bridge via JNI.
//
// The native library is loaded by the autofill service, which registers its
// Context with `ndk_context` during `nativeInit`. Everything here runs on a
// service context, so activities are launched with FLAG_ACTIVITY_NEW_TASK.
//
// ## Architecture notes
//
// Reading the vault and launching the save screen complete synchronously.
//
// The unlock and picker screens are activities whose result comes back
// through the service's authentication callback. Those methods launch the
// Intent and return `LockerError::Bridge` explaining that the chosen
// credential will arrive via `completeAuthentication`.

#![cfg(target_os = "android")]

use jni::JNIEnv;
use jni::objects::{JObject, JString, JValue};

use locker_core::error::{LockerError, Result};
use locker_core::types::{CredentialRecord, SaveCandidate};

use crate::traits::*;

// ---------------------------------------------------------------------------
// JNI bootstrap helpers
// ---------------------------------------------------------------------------

/// SharedPreferences file the app publishes the decrypted vault into.
const PREFS_FILE: &str = "locker_autofill";

/// Key holding the vault JSON inside [`PREFS_FILE`].
const VAULT_PAYLOAD_KEY: &str = "vault_payload";

/// Activity that hosts the unlock, picker and save screens.
const MAIN_ACTIVITY: &str = "com.cystack.locker.MainActivity";

const FLAG_ACTIVITY_NEW_TASK: i32 = 0x1000_0000;
const FLAG_ACTIVITY_CLEAR_TOP: i32 = 0x0400_0000;

/// Obtain a [`JNIEnv`] handle from the global Android context.
fn jni_env() -> Result<JNIEnv<'static>> {
    let ctx = ndk_context::android_context();
    // SAFETY: `ctx.vm()` is the `JavaVM*` registered in `nativeInit`; it
    // stays valid for the lifetime of the process.
    let vm = unsafe { jni::JavaVM::from_raw(ctx.vm().cast()) }
        .map_err(|e| LockerError::Bridge(format!("failed to obtain JavaVM: {e}")))?;
    vm.attach_current_thread_permanently()
        .map_err(|e| LockerError::Bridge(format!("failed to attach JNI thread: {e}")))
}

/// The service `Context` registered at init.
fn context() -> Result<JObject<'static>> {
    let ctx = ndk_context::android_context();
    let ptr = ctx.context();
    if ptr.is_null() {
        return Err(LockerError::Bridge(
            "Android context is null: nativeInit has not run".into(),
        ));
    }
    // SAFETY: `nativeInit` registers a global reference to the service's
    // application context.
    Ok(unsafe { JObject::from_raw(ptr.cast()) })
}

fn jni_err(context: &str, e: jni::errors::Error) -> LockerError {
    LockerError::Bridge(format!("{context}: {e}"))
}

// ---------------------------------------------------------------------------
// Bridge struct
// ---------------------------------------------------------------------------

/// Android implementation of the platform bridge. Zero-sized; all state
/// lives on the Java side.
pub struct AndroidBridge;

impl AndroidBridge {
    /// No JNI work happens until a trait method is called.
    pub fn new() -> Self {
        Self
    }
}

impl Default for AndroidBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformBridge for AndroidBridge {
    fn platform_name(&self) -> &str {
        "Android"
    }
}

// ---------------------------------------------------------------------------
// NativeVault: SharedPreferences (MODE_PRIVATE)
// ---------------------------------------------------------------------------

impl NativeVault for AndroidBridge {
    /// Read the vault JSON the app last published.
    ///
    /// Returns `Ok(None)` when the key is absent, which is how the app
    /// signals that nobody is signed in.
    fn load_vault_payload(&self) -> Result<Option<String>> {
        let mut env = jni_env()?;
        let context = context()?;

        let prefs = shared_preferences(&mut env, &context)?;
        let j_key: JString = env
            .new_string(VAULT_PAYLOAD_KEY)
            .map_err(|e| jni_err("new_string(key)", e))?;

        let value: JObject = env
            .call_method(
                &prefs,
                "getString",
                "(Ljava/lang/String;Ljava/lang/String;)Ljava/lang/String;",
                &[JValue::Object(&j_key), JValue::Object(&JObject::null())],
            )
            .map_err(|e| jni_err("getString", e))?
            .l()
            .map_err(|e| jni_err("getString->l", e))?;

        if value.is_null() {
            tracing::debug!("Android: no vault payload published");
            return Ok(None);
        }

        let payload: String = env
            .get_string(&JString::from(value))
            .map_err(|e| jni_err("get_string(payload)", e))?
            .into();
        tracing::debug!(bytes = payload.len(), "Android: vault payload loaded");
        Ok(Some(payload))
    }
}

// ---------------------------------------------------------------------------
// NativeAuthPrompt: MainActivity in autofill mode
// ---------------------------------------------------------------------------

impl NativeAuthPrompt for AndroidBridge {
    /// Launch the unlock screen for `site_uri`.
    ///
    /// The result is asynchronous: the activity hands the chosen credential
    /// back through `completeAuthentication`, so this always ends in
    /// `Err(Bridge(..))` once the intent is out.
    fn present_authentication(&self, site_uri: &str) -> Result<Option<CredentialRecord>> {
        let mut env = jni_env()?;
        let context = context()?;

        tracing::info!(site = %site_uri, "Android: launching unlock screen");

        let intent = main_activity_intent(&mut env, &context)?;
        put_int_extra(&mut env, &intent, "autofill", 1)?;
        put_string_extra(&mut env, &intent, "domain", site_uri)?;
        start_activity(&mut env, &context, &intent)?;

        Err(LockerError::Bridge(
            "Unlock screen launched. The chosen credential arrives via \
             completeAuthentication once the user finishes."
                .into(),
        ))
    }

    /// Launch the picker over `candidates`. Asynchronous like
    /// [`present_authentication`](Self::present_authentication).
    fn present_selector(&self, candidates: &[CredentialRecord]) -> Result<Option<CredentialRecord>> {
        let mut env = jni_env()?;
        let context = context()?;

        tracing::info!(candidates = candidates.len(), "Android: launching credential picker");

        let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        let ids_json = serde_json::to_string(&ids)?;

        let intent = main_activity_intent(&mut env, &context)?;
        put_int_extra(&mut env, &intent, "autofill", 1)?;
        put_string_extra(&mut env, &intent, "candidateIds", &ids_json)?;
        start_activity(&mut env, &context, &intent)?;

        Err(LockerError::Bridge(
            "Credential picker launched. The selection arrives via \
             completeAuthentication once the user finishes."
                .into(),
        ))
    }
}

// ---------------------------------------------------------------------------
// NativeSaveFlow: MainActivity in save mode
// ---------------------------------------------------------------------------

impl NativeSaveFlow for AndroidBridge {
    fn start_save_flow(&self, candidate: &SaveCandidate) -> Result<()> {
        let mut env = jni_env()?;
        let context = context()?;
        let domain = candidate.site.canonical_uri().unwrap_or_default();

        tracing::info!(domain = %domain, "Android: launching save screen");

        let intent = main_activity_intent(&mut env, &context)?;
        put_int_extra(&mut env, &intent, "savePassword", 1)?;
        put_string_extra(&mut env, &intent, "domain", &domain)?;
        put_string_extra(&mut env, &intent, "username", candidate.username.as_deref().unwrap_or_default())?;
        put_string_extra(&mut env, &intent, "password", candidate.password.as_deref().unwrap_or_default())?;
        start_activity(&mut env, &context, &intent)?;

        tracing::info!("Android: save screen launched");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NativeStorage: Context.getFilesDir()
// ---------------------------------------------------------------------------

impl NativeStorage for AndroidBridge {
    fn data_dir(&self) -> Result<String> {
        let mut env = jni_env()?;
        let context = context()?;

        let files_dir: JObject = env
            .call_method(&context, "getFilesDir", "()Ljava/io/File;", &[])
            .map_err(|e| jni_err("getFilesDir", e))?
            .l()
            .map_err(|e| jni_err("getFilesDir->l", e))?;

        let j_path: JObject = env
            .call_method(&files_dir, "getAbsolutePath", "()Ljava/lang/String;", &[])
            .map_err(|e| jni_err("getAbsolutePath", e))?
            .l()
            .map_err(|e| jni_err("getAbsolutePath->l", e))?;

        let path: String = env
            .get_string(&JString::from(j_path))
            .map_err(|e| jni_err("get_string(filesDir)", e))?
            .into();
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// `context.getSharedPreferences(PREFS_FILE, MODE_PRIVATE)`.
fn shared_preferences<'a>(env: &mut JNIEnv<'a>, context: &JObject<'_>) -> Result<JObject<'a>> {
    let j_name: JString = env
        .new_string(PREFS_FILE)
        .map_err(|e| jni_err("new_string(prefs_name)", e))?;

    env.call_method(
        context,
        "getSharedPreferences",
        "(Ljava/lang/String;I)Landroid/content/SharedPreferences;",
        &[
            JValue::Object(&j_name),
            JValue::Int(0), // MODE_PRIVATE
        ],
    )
    .map_err(|e| jni_err("getSharedPreferences", e))?
    .l()
    .map_err(|e| jni_err("getSharedPreferences->l", e))
}

/// An explicit Intent for [`MAIN_ACTIVITY`] in this package, flagged to
/// start from a non-activity context.
fn main_activity_intent<'a>(env: &mut JNIEnv<'a>, context: &JObject<'_>) -> Result<JObject<'a>> {
    let j_pkg: JObject = env
        .call_method(context, "getPackageName", "()Ljava/lang/String;", &[])
        .map_err(|e| jni_err("getPackageName", e))?
        .l()
        .map_err(|e| jni_err("getPackageName->l", e))?;

    let j_class: JString = env
        .new_string(MAIN_ACTIVITY)
        .map_err(|e| jni_err("new_string(activity)", e))?;

    let intent: JObject = env
        .new_object("android/content/Intent", "()V", &[])
        .map_err(|e| jni_err("new Intent", e))?;

    env.call_method(
        &intent,
        "setClassName",
        "(Ljava/lang/String;Ljava/lang/String;)Landroid/content/Intent;",
        &[JValue::Object(&j_pkg), JValue::Object(&j_class)],
    )
    .map_err(|e| jni_err("setClassName", e))?;

    env.call_method(
        &intent,
        "setFlags",
        "(I)Landroid/content/Intent;",
        &[JValue::Int(FLAG_ACTIVITY_NEW_TASK | FLAG_ACTIVITY_CLEAR_TOP)],
    )
    .map_err(|e| jni_err("setFlags", e))?;

    Ok(intent)
}

fn put_string_extra(env: &mut JNIEnv<'_>, intent: &JObject<'_>, name: &str, value: &str) -> Result<()> {
    let j_name: JString = env
        .new_string(name)
        .map_err(|e| jni_err("new_string(extra name)", e))?;
    let j_value: JString = env
        .new_string(value)
        .map_err(|e| jni_err("new_string(extra value)", e))?;

    env.call_method(
        intent,
        "putExtra",
        "(Ljava/lang/String;Ljava/lang/String;)Landroid/content/Intent;",
        &[JValue::Object(&j_name), JValue::Object(&j_value)],
    )
    .map_err(|e| jni_err("putExtra(String)", e))?;
    Ok(())
}

fn put_int_extra(env: &mut JNIEnv<'_>, intent: &JObject<'_>, name: &str, value: i32) -> Result<()> {
    let j_name: JString = env
        .new_string(name)
        .map_err(|e| jni_err("new_string(extra name)", e))?;

    env.call_method(
        intent,
        "putExtra",
        "(Ljava/lang/String;I)Landroid/content/Intent;",
        &[JValue::Object(&j_name), JValue::Int(value)],
    )
    .map_err(|e| jni_err("putExtra(int)", e))?;
    Ok(())
}

fn start_activity(env: &mut JNIEnv<'_>, context: &JObject<'_>, intent: &JObject<'_>) -> Result<()> {
    env.call_method(
        context,
        "startActivity",
        "(Landroid/content/Intent;)V",
        &[JValue::Object(intent)],
    )
    .map_err(|e| jni_err("startActivity", e))?;
    Ok(())
}
