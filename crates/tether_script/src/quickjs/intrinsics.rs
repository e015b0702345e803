//! Helpers evaluated into every secondary domain. Class discovery,
//! construction and calls go through them instead of the raw object API.

pub(crate) const SOURCE: &str = r#"({
    classes(exports) {
        const found = [];
        const seen = new Set();
        const walk = (scope, ns) => {
            if (seen.has(scope)) return;
            seen.add(scope);
            for (const key of Object.keys(scope)) {
                const value = scope[key];
                if (typeof value === "function" && value.prototype !== undefined) {
                    found.push([ns, key, value]);
                } else if (value !== null && typeof value === "object") {
                    walk(value, ns === "" ? key : ns + "." + key);
                }
            }
        };
        walk(exports, "");
        return found;
    },
    method(cls, name, arity) {
        const f = cls.prototype[name];
        return typeof f === "function" && f.length === arity ? f : undefined;
    },
    construct(cls) {
        return new cls();
    },
    call(f, self, args) {
        return f.apply(self, args);
    },
    fields(cls) {
        const out = [];
        const declared = cls.fields;
        if (declared !== null && typeof declared === "object") {
            for (const key of Object.keys(declared)) {
                out.push(key, String(declared[key]));
            }
        }
        return out;
    },
})"#;

/// Wrap an assembly so its top level fills a fresh `exports` object.
pub(crate) fn wrap_assembly(source: &str) -> String {
    format!("(function (exports) {{\n{source}\n;return exports;\n}})({{}})")
}
