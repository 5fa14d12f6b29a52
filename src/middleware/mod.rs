/*
 * Responsibility
 * - middleware public interface
 * - path_auth: credential-in-path gate, http: transport-level layers
 */
pub mod http;
pub mod path_auth;
