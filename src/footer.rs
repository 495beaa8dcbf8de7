//! Static page footer: link columns and a social button. No state.

pub struct FooterLink {
    pub name: &'static str,
    pub href: &'static str,
}

pub const DEVELOPER_LINKS: [FooterLink; 3] = [
    FooterLink {
        name: "> knny.io",
        href: "https://knny.io",
    },
    FooterLink {
        name: "> shop posters",
        href: "https://knny.io/shop",
    },
    FooterLink {
        name: "> about KNNY",
        href: "https://knny.io/about",
    },
];

pub const SOCIAL_LINK: FooterLink = FooterLink {
    name: "follow me on twitter",
    href: "https://twitter.com/0xknny",
};

/// Appends the footer markup: a "more places" column and the social column.
/// External links open in a new browsing context.
pub fn render_footer(out: &mut String) {
    out.push_str("<footer class=\"footer\"><div class=\"footer-links\">");
    out.push_str("<span class=\"footer-title\">more places</span>");
    for link in DEVELOPER_LINKS {
        out.push_str("<a class=\"footer-link\" target=\"_blank\" rel=\"noopener noreferrer\" href=\"");
        out.push_str(link.href);
        out.push_str("\">");
        out.push_str(link.name);
        out.push_str("</a>");
    }
    out.push_str("</div><div class=\"footer-social\">");
    out.push_str("<span class=\"footer-title\">");
    out.push_str(SOCIAL_LINK.name);
    out.push_str("</span>");
    out.push_str("<a class=\"social-btn\" target=\"_blank\" rel=\"noopener noreferrer\" href=\"");
    out.push_str(SOCIAL_LINK.href);
    out.push_str("\">&#x1D54F;</a>");
    out.push_str("</div></footer>\n");
}
