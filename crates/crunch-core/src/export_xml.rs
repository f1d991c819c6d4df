use crate::export::Atlas;
use std::fmt::Write;

/// Build the XML layout document:
///
/// ```text
/// <atlas>
///     <tex n="atlas0" w="256" h="128">
///         <img n="hero/0" x="0" y="0" w="16" h="16" fx="0" fy="0" fw="16" fh="16" r="0" />
///     </tex>
/// </atlas>
/// ```
///
/// `fx/fy/fw/fh` appear only when trim is enabled, `r` only when rotation is enabled.
pub fn to_xml(atlas: &Atlas) -> String {
    let mut s = String::from("<atlas>\n");
    for page in &atlas.pages {
        let _ = writeln!(
            s,
            "\t<tex n=\"{}\" w=\"{}\" h=\"{}\">",
            xml_escape(&page.name),
            page.width,
            page.height
        );
        for img in &page.images {
            let _ = write!(
                s,
                "\t\t<img n=\"{}\" x=\"{}\" y=\"{}\" w=\"{}\" h=\"{}\" ",
                xml_escape(&img.name),
                img.x,
                img.y,
                img.width,
                img.height
            );
            if let Some(f) = &img.frame {
                let _ = write!(
                    s,
                    "fx=\"{}\" fy=\"{}\" fw=\"{}\" fh=\"{}\" ",
                    f.x, f.y, f.width, f.height
                );
            }
            if let Some(r) = img.rotated {
                let _ = write!(s, "r=\"{}\" ", u8::from(r));
            }
            s.push_str("/>\n");
        }
        s.push_str("\t</tex>\n");
    }
    s.push_str("</atlas>\n");
    s
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
