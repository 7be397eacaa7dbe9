// FICHIER : engine/src/utils/macros.rs

/// Affiche une info à l'utilisateur et logue l'événement
#[macro_export]
macro_rules! user_info {
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        println!("{}", msg);
        tracing::info!(event = "user_notification", message = %msg);
    }};
}

/// Affiche un succès à l'utilisateur
#[macro_export]
macro_rules! user_success {
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        println!("✅ {}", msg);
        tracing::info!(event = "user_success", message = %msg);
    }};
}

/// Affiche une erreur sur stderr et logue l'événement avec son composant
#[macro_export]
macro_rules! user_error {
    (component = $comp:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        eprintln!("❌ [{}] {}", $comp, msg);
        tracing::error!(event = "user_error", component = $comp, message = %msg);
    }};
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        eprintln!("❌ {}", msg);
        tracing::error!(event = "user_error", message = %msg);
    }};
}
