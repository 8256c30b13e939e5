//! 客户端标识提取
//!
//! 只做尽力而为的提取，不校验格式：畸形值原样作为不透明的键使用。
//! 这些头可以被客户端伪造，只有部署在可信代理之后才有意义。

use http::HeaderMap;

/// CDN 提供的真实连接 IP
pub const CDN_CONNECTING_IP_HEADER: &str = "cf-connecting-ip";
pub const REAL_IP_HEADER: &str = "x-real-ip";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// 无法识别时的回退值
pub const FALLBACK_CLIENT_IP: &str = "127.0.0.1";

/// 按优先级提取客户端 IP
///
/// 1. `cf-connecting-ip`
/// 2. `x-real-ip`
/// 3. `x-forwarded-for` 的第一项
/// 4. `127.0.0.1`
pub fn extract_client_ip(headers: &HeaderMap) -> String {
    header_value(headers, CDN_CONNECTING_IP_HEADER)
        .or_else(|| header_value(headers, REAL_IP_HEADER))
        .or_else(|| {
            header_value(headers, FORWARDED_FOR_HEADER)
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .unwrap_or(FALLBACK_CLIENT_IP)
        .to_string()
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
