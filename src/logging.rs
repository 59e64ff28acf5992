// Macros file - tracing macros are imported within the macro definitions

/// Standardized logging macros for consistent field names and message patterns across the application
///
/// These macros ensure:
/// - Consistent field naming conventions
/// - Appropriate logging levels for different scenarios
/// - Structured logging with context

// ============================================================================
// API Operation Logging Macros
// ============================================================================

/// Log the start of an API operation with consistent fields
#[macro_export]
macro_rules! log_api_start {
    ($operation:expr, material_id = $material_id:expr) => {
        tracing::debug!(
            operation = $operation,
            material_id = %$material_id,
            "API operation started"
        );
    };
    ($operation:expr, user_id = $user_id:expr) => {
        tracing::debug!(
            operation = $operation,
            user_id = %$user_id,
            "API operation started"
        );
    };
    ($operation:expr) => {
        tracing::debug!(
            operation = $operation,
            "API operation started"
        );
    };
}

/// Log successful completion of an API operation
#[macro_export]
macro_rules! log_api_success {
    ($operation:expr, material_id = $material_id:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            material_id = %$material_id,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, user_id = $user_id:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            user_id = %$user_id,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, count = $count:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            count = $count,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            "API operation completed: {}", $msg
        );
    };
}

/// Log API operation errors with consistent structure
#[macro_export]
macro_rules! log_api_error {
    ($operation:expr, material_id = $material_id:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            material_id = %$material_id,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
    ($operation:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
}

/// Log API warnings with context
#[macro_export]
macro_rules! log_api_warn {
    ($operation:expr, material_id = $material_id:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            material_id = %$material_id,
            "API operation warning: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            "API operation warning: {}", $msg
        );
    };
}

// ============================================================================
// AI Service Logging Macros
// ============================================================================

/// Log AI completion operations with provider context
#[macro_export]
macro_rules! log_ai_operation {
    (start, $operation:expr, material_id = $material_id:expr) => {
        tracing::info!(
            component = "ai_service",
            operation = $operation,
            material_id = %$material_id,
            "AI operation started"
        );
    };
    (success, $operation:expr, material_id = $material_id:expr, count = $count:expr) => {
        tracing::info!(
            component = "ai_service",
            operation = $operation,
            material_id = %$material_id,
            result_count = $count,
            "AI operation completed successfully"
        );
    };
    (warn, $operation:expr, $msg:expr) => {
        tracing::warn!(
            component = "ai_service",
            operation = $operation,
            "AI operation warning: {}", $msg
        );
    };
}

// ============================================================================
// System Event Logging Macros
// ============================================================================

/// Log system startup and shutdown events
#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
}

// ============================================================================
// Validation Logging Macros
// ============================================================================

/// Log validation results consistently
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    #[test]
    fn test_logging_macros_compile() {
        let material_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let error = anyhow::anyhow!("test error");

        // Test that all macro variants compile successfully
        log_api_start!("test_operation", material_id = material_id);
        log_api_start!("test_operation", user_id = user_id);
        log_api_start!("test_operation");

        log_api_success!("test_operation", material_id = material_id, "operation completed");
        log_api_success!("test_operation", user_id = user_id, "operation completed");
        log_api_success!("test_operation", count = 5, "materials processed");
        log_api_success!("test_operation", "operation completed");

        log_api_error!("test_operation", material_id = material_id, error = error, "it broke");
        log_api_error!("test_operation", error = error, "it broke");

        log_api_warn!("test_operation", material_id = material_id, "operation warning");
        log_api_warn!("test_operation", "operation warning");

        log_ai_operation!(start, "generate_flashcards", material_id = material_id);
        log_ai_operation!(
            success,
            "generate_flashcards",
            material_id = material_id,
            count = 10
        );
        log_ai_operation!(warn, "generate_flashcards", "empty result");

        log_system_event!(startup, component = "server", "server starting");
        log_system_event!(config, "configuration loaded successfully");

        log_validation!(success, "api_request", "request validated");
        log_validation!(failure, "api_request", error = error);
    }
}
