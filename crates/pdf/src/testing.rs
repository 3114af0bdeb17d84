//! 测试用的小型 AcroForm 文档

use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// 外观流必须是间接对象
fn state_stream(doc: &mut Document) -> Object {
  Object::Reference(doc.add_object(Stream::new(
    dictionary! {
      "Type" => "XObject",
      "Subtype" => "Form",
      "BBox" => vec![0.into(), 0.into(), 15.into(), 15.into()],
    },
    Vec::new(),
  )))
}

fn rect(x1: i64, y1: i64, x2: i64, y2: i64) -> Object {
  Object::Array(vec![x1.into(), y1.into(), x2.into(), y2.into()])
}

/// 两页文档；第一页依次为 name、age、agree、contact.email、color 与两个 size 单选按钮
pub(crate) fn sample_form() -> (Document, Vec<ObjectId>) {
  let mut doc = Document::with_version("1.5");
  let pages_id = doc.new_object_id();
  let helv = doc.add_object(dictionary! {
    "Type" => "Font",
    "Subtype" => "Type1",
    "BaseFont" => "Helvetica",
    "Encoding" => "WinAnsiEncoding",
  });
  let page0 = doc.add_object(dictionary! {
    "Type" => "Page",
    "Parent" => pages_id,
  });
  let page1 = doc.add_object(dictionary! {
    "Type" => "Page",
    "Parent" => pages_id,
  });

  let name = doc.add_object(dictionary! {
    "Type" => "Annot",
    "Subtype" => "Widget",
    "FT" => "Tx",
    "T" => Object::string_literal("name"),
    "Rect" => rect(100, 700, 300, 720),
    "DA" => Object::string_literal("/Helv 12 Tf 0 0 1 rg"),
    "P" => page0,
  });
  let age = doc.add_object(dictionary! {
    "Type" => "Annot",
    "Subtype" => "Widget",
    "FT" => "Tx",
    "T" => Object::string_literal("age"),
    "Rect" => rect(100, 670, 300, 690),
    "P" => page0,
  });
  let (yes, agree_off) = (state_stream(&mut doc), state_stream(&mut doc));
  let agree = doc.add_object(dictionary! {
    "Type" => "Annot",
    "Subtype" => "Widget",
    "FT" => "Btn",
    "T" => Object::string_literal("agree"),
    "Rect" => rect(100, 640, 115, 655),
    "V" => "Off",
    "AS" => "Off",
    "AP" => dictionary! {
      "N" => dictionary! { "Yes" => yes, "Off" => agree_off },
    },
    "P" => page0,
  });

  let contact = doc.new_object_id();
  let email_field = doc.new_object_id();
  let email = doc.add_object(dictionary! {
    "Type" => "Annot",
    "Subtype" => "Widget",
    "Parent" => email_field,
    "Rect" => rect(100, 610, 300, 630),
    "P" => page0,
  });
  doc.objects.insert(
    email_field,
    Object::Dictionary(dictionary! {
      "T" => Object::string_literal("email"),
      "Parent" => contact,
      "Kids" => vec![email.into()],
    }),
  );
  doc.objects.insert(
    contact,
    Object::Dictionary(dictionary! {
      "T" => Object::string_literal("contact"),
      "FT" => "Tx",
      "Kids" => vec![email_field.into()],
    }),
  );

  let color = doc.add_object(dictionary! {
    "Type" => "Annot",
    "Subtype" => "Widget",
    "FT" => "Ch",
    "Ff" => 1_i64 << 17,
    "T" => Object::string_literal("color"),
    "Opt" => vec![
      Object::string_literal("red"),
      Object::Array(vec![Object::string_literal("green"), Object::string_literal("Green")]),
    ],
    "Rect" => rect(100, 580, 300, 600),
    "P" => page0,
  });

  let size = doc.new_object_id();
  let (s_on, s_off) = (state_stream(&mut doc), state_stream(&mut doc));
  let (l_on, l_off) = (state_stream(&mut doc), state_stream(&mut doc));
  let small = doc.add_object(dictionary! {
    "Type" => "Annot",
    "Subtype" => "Widget",
    "Parent" => size,
    "AS" => "Off",
    "AP" => dictionary! { "N" => dictionary! { "S" => s_on, "Off" => s_off } },
    "Rect" => rect(100, 550, 115, 565),
    "P" => page0,
  });
  let large = doc.add_object(dictionary! {
    "Type" => "Annot",
    "Subtype" => "Widget",
    "Parent" => size,
    "AS" => "Off",
    "AP" => dictionary! { "N" => dictionary! { "L" => l_on, "Off" => l_off } },
    "Rect" => rect(120, 550, 135, 565),
    "P" => page0,
  });
  doc.objects.insert(
    size,
    Object::Dictionary(dictionary! {
      "FT" => "Btn",
      "Ff" => 1_i64 << 15,
      "T" => Object::string_literal("size"),
      "V" => "Off",
      "Kids" => vec![small.into(), large.into()],
    }),
  );

  if let Ok(page) = doc.get_dictionary_mut(page0) {
    page.set(
      "Annots",
      vec![
        name.into(),
        age.into(),
        agree.into(),
        email.into(),
        color.into(),
        small.into(),
        large.into(),
      ],
    );
  }

  let acroform = doc.add_object(dictionary! {
    "Fields" => vec![name.into(), age.into(), agree.into(), contact.into(), color.into(), size.into()],
    "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
    "DR" => dictionary! { "Font" => dictionary! { "Helv" => helv } },
  });
  doc.objects.insert(
    pages_id,
    Object::Dictionary(dictionary! {
      "Type" => "Pages",
      "Kids" => vec![page0.into(), page1.into()],
      "Count" => 2,
      "MediaBox" => rect(0, 0, 612, 792),
    }),
  );
  let catalog = doc.add_object(dictionary! {
    "Type" => "Catalog",
    "Pages" => pages_id,
    "AcroForm" => acroform,
  });
  doc.trailer.set("Root", catalog);
  (doc, vec![page0, page1])
}
