//! Generated client-side routing shim.
//!
//! Backend-authored page script assumes it is served from the backend's
//! own origin. Once proxied, its relative network calls would resolve
//! against the proxy origin without the slug prefix and miss. The shim
//! runs before any page script, wraps `fetch` and `XMLHttpRequest.open`,
//! and reroutes root-relative targets through `origin/{slug}`. `Request`
//! objects carry an already-resolved absolute URL, so they get the
//! same-origin variant of the check and are rebuilt onto the slug path.
//!
//! It also defines `__slugProxyBoot`, the bounded poll-and-retry guard
//! the bootstrap-deferral pass wraps platform init calls in. The retry
//! loop is an artifact of document order (the shim runs before the
//! platform runtime has loaded), kept strictly as generated client
//! script.
//!
//! The script must survive the later link-rewrite passes, so it never
//! contains a quoted root-relative literal; slash tests use char codes.

use crate::rewrite::RewriteContext;

const SHIM_TEMPLATE: &str = r#"(function(){
var S="@SLUG@";
var SLASH=String.fromCharCode(47);
var P=location.origin+SLASH+S;
function reroute(u){
if(typeof u!=="string"||u.length===0){return u;}
if(u.charCodeAt(0)!==47||u.charCodeAt(1)===47){return u;}
return P+u;
}
function rerouteAbs(u){
var o=location.origin;
if(u.indexOf(o+SLASH)!==0){return u;}
var p=u.slice(o.length);
if(p===SLASH+S){return u;}
if(p.indexOf(SLASH+S+SLASH)===0){return u;}
if(p.indexOf(SLASH+S+"?")===0){return u;}
return o+SLASH+S+p;
}
if(window.fetch){
var f=window.fetch;
window.fetch=function(input,init){
if(typeof input==="string"){input=reroute(input);}
else if(typeof Request!=="undefined"&&input instanceof Request){
var r=rerouteAbs(input.url);
if(r!==input.url){input=new Request(r,input);}
}
return f.call(this,input,init);
};
}
if(window.XMLHttpRequest&&XMLHttpRequest.prototype.open){
var o=XMLHttpRequest.prototype.open;
XMLHttpRequest.prototype.open=function(method,u){
arguments[1]=reroute(u);
return o.apply(this,arguments);
};
}
window.__slugProxyBoot=function(name,run){
var tries=0;
(function tick(){
if(typeof window[name]==="function"){run();return;}
if(tries++<@RETRIES@){setTimeout(tick,@DELAY@);}
})();
};
})();"#;

/// Render the shim script element, reusing the document's CSP nonce when
/// one was found so the backend's own policy does not block it.
pub fn routing_shim(ctx: &RewriteContext, nonce: Option<&str>) -> String {
    let script = SHIM_TEMPLATE
        .replace("@SLUG@", &ctx.slug)
        .replace("@RETRIES@", &ctx.boot_retries.to_string())
        .replace("@DELAY@", &ctx.boot_delay_ms.to_string());

    match nonce {
        Some(nonce) => format!("<script nonce=\"{}\">{}</script>", nonce, script),
        None => format!("<script>{}</script>", script),
    }
}
